use burn::tensor::{backend::Backend, Data, ElementConversion, Int, Shape, Tensor};

/// Bring every token sequence to exactly `max_len` entries.
///
/// Short sequences are zero-padded at the end. Long sequences keep their last `max_len` tokens.
pub fn pad_sequences(sequences: Vec<Vec<u32>>, max_len: usize) -> Vec<Vec<u32>> {
    sequences
        .into_iter()
        .map(|mut tokens| {
            if tokens.len() > max_len {
                tokens.drain(..tokens.len() - max_len);
            }

            tokens.resize(max_len, 0);

            tokens
        })
        .collect()
}

/// Stack equal-length token sequences into a `[batch_size, seq_length]` integer tensor
pub fn to_int_tensor<B: Backend>(
    sequences: &[Vec<u32>],
    seq_length: usize,
    device: &B::Device,
) -> Tensor<B, 2, Int> {
    let batch_size = sequences.len();

    let values: Vec<B::IntElem> = sequences
        .iter()
        .flat_map(|tokens| {
            debug_assert_eq!(tokens.len(), seq_length);

            tokens.iter().map(|token| (*token as i64).elem())
        })
        .collect();

    Tensor::from_data(Data::new(values, Shape::new([batch_size, seq_length])), device)
}

/// Build a 1D integer tensor of class ids
pub fn to_class_tensor<B: Backend>(labels: &[usize], device: &B::Device) -> Tensor<B, 1, Int> {
    let values: Vec<B::IntElem> = labels.iter().map(|label| (*label as i64).elem()).collect();

    Tensor::from_data(Data::new(values, Shape::new([labels.len()])), device)
}

/// Reverse a `[batch_size, seq_length, features]` tensor along the time axis
pub fn reverse_time<B: Backend>(input: Tensor<B, 3>) -> Tensor<B, 3> {
    let [_batch_size, seq_length, _features] = input.dims();

    let indices: Vec<usize> = (0..seq_length).rev().collect();
    let indices = to_class_tensor::<B>(&indices, &input.device());

    input.select(1, indices)
}

#[cfg(test)]
mod tests {
    use super::*;

    use burn::backend::NdArray;
    use pretty_assertions::assert_eq;

    #[test]
    fn pads_after_and_truncates_before() {
        let padded = pad_sequences(vec![vec![4, 5], vec![1, 2, 3, 4, 5, 6], vec![]], 4);

        assert_eq!(
            padded,
            vec![vec![4, 5, 0, 0], vec![3, 4, 5, 6], vec![0, 0, 0, 0]]
        );
    }

    #[test]
    fn builds_token_tensor() {
        let device = Default::default();
        let tensor = to_int_tensor::<NdArray>(&[vec![1, 2, 0], vec![3, 0, 0]], 3, &device);

        assert_eq!(tensor.dims(), [2, 3]);
        assert_eq!(
            tensor.into_data().convert::<i64>().value,
            vec![1, 2, 0, 3, 0, 0]
        );
    }

    #[test]
    fn reverses_time_axis() {
        let device = Default::default();
        let input =
            Tensor::<NdArray, 3>::from_floats([[[1.0, 2.0], [3.0, 4.0], [5.0, 6.0]]], &device);

        assert_eq!(
            reverse_time(input).into_data().convert::<f32>().value,
            vec![5.0, 6.0, 3.0, 4.0, 1.0, 2.0]
        );
    }
}
