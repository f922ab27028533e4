use std::{fmt, io, path::Path};

const WIDTH: f64 = 640.0;
const HEIGHT: f64 = 480.0;
const MARGIN: f64 = 60.0;

const TRAINING_COLOR: &str = "#1f77b4";
const VALIDATION_COLOR: &str = "#ff7f0e";

/// Render training vs. validation loss per epoch as an SVG line chart
pub fn render_loss_chart(loss: &[f64], val_loss: &[f64]) -> Result<String, fmt::Error> {
    let mut svg = String::new();
    write_loss_chart(&mut svg, loss, val_loss)?;

    Ok(svg)
}

fn write_loss_chart(svg: &mut impl fmt::Write, loss: &[f64], val_loss: &[f64]) -> fmt::Result {
    let epochs = loss.len().max(val_loss.len()).max(1);

    let max = loss
        .iter()
        .chain(val_loss)
        .copied()
        .filter(|value| value.is_finite())
        .fold(f64::MIN, f64::max);
    let min = loss
        .iter()
        .chain(val_loss)
        .copied()
        .filter(|value| value.is_finite())
        .fold(f64::MAX, f64::min);

    let (min, max) = if min > max {
        (0.0, 1.0)
    } else if (max - min).abs() < f64::EPSILON {
        (min - 0.5, max + 0.5)
    } else {
        (min, max)
    };

    let plot_width = WIDTH - 2.0 * MARGIN;
    let plot_height = HEIGHT - 2.0 * MARGIN;

    let x = |epoch: usize| {
        if epochs == 1 {
            MARGIN + plot_width / 2.0
        } else {
            MARGIN + plot_width * epoch as f64 / (epochs - 1) as f64
        }
    };
    let y = |value: f64| MARGIN + plot_height * (1.0 - (value - min) / (max - min));

    writeln!(
        svg,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{WIDTH}" height="{HEIGHT}" font-family="sans-serif" font-size="12">"#
    )?;
    writeln!(svg, r#"<rect width="100%" height="100%" fill="white"/>"#)?;

    // Axes
    writeln!(
        svg,
        r#"<line x1="{MARGIN}" y1="{bottom}" x2="{right}" y2="{bottom}" stroke="black"/>"#,
        bottom = HEIGHT - MARGIN,
        right = WIDTH - MARGIN,
    )?;
    writeln!(
        svg,
        r#"<line x1="{MARGIN}" y1="{MARGIN}" x2="{MARGIN}" y2="{bottom}" stroke="black"/>"#,
        bottom = HEIGHT - MARGIN,
    )?;
    writeln!(
        svg,
        r#"<text x="{cx}" y="{ty}" text-anchor="middle">Epochs</text>"#,
        cx = WIDTH / 2.0,
        ty = HEIGHT - MARGIN / 3.0,
    )?;
    writeln!(
        svg,
        r#"<text x="{tx}" y="{cy}" text-anchor="middle" transform="rotate(-90 {tx} {cy})">Loss</text>"#,
        tx = MARGIN / 3.0,
        cy = HEIGHT / 2.0,
    )?;
    writeln!(
        svg,
        r#"<text x="{lx}" y="{ty}" text-anchor="end">{max:.4}</text>"#,
        lx = MARGIN - 4.0,
        ty = MARGIN + 4.0,
    )?;
    writeln!(
        svg,
        r#"<text x="{lx}" y="{ty}" text-anchor="end">{min:.4}</text>"#,
        lx = MARGIN - 4.0,
        ty = HEIGHT - MARGIN,
    )?;

    for (values, color) in [(loss, TRAINING_COLOR), (val_loss, VALIDATION_COLOR)] {
        let points = values
            .iter()
            .enumerate()
            .filter(|(_, value)| value.is_finite())
            .map(|(epoch, value)| format!("{:.2},{:.2}", x(epoch), y(*value)))
            .collect::<Vec<_>>()
            .join(" ");

        writeln!(
            svg,
            r#"<polyline fill="none" stroke="{color}" stroke-width="2" points="{points}"/>"#
        )?;
    }

    // Legend
    for (row, (label, color)) in [("Training", TRAINING_COLOR), ("Validation", VALIDATION_COLOR)]
        .into_iter()
        .enumerate()
    {
        let ly = MARGIN + 16.0 * row as f64;
        let lx = WIDTH - MARGIN - 100.0;

        writeln!(
            svg,
            r#"<line x1="{lx}" y1="{ly}" x2="{x2}" y2="{ly}" stroke="{color}" stroke-width="2"/>"#,
            x2 = lx + 20.0,
        )?;
        writeln!(
            svg,
            r#"<text x="{tx}" y="{ty}">{label}</text>"#,
            tx = lx + 26.0,
            ty = ly + 4.0,
        )?;
    }

    writeln!(svg, "</svg>")
}

/// Write the loss chart to `path`
pub fn save_loss_chart(path: &Path, loss: &[f64], val_loss: &[f64]) -> io::Result<()> {
    let svg = render_loss_chart(loss, val_loss)
        .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;

    std::fs::write(path, svg)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_one_line_per_series() -> Result<(), fmt::Error> {
        let svg = render_loss_chart(&[0.9, 0.6, 0.4], &[1.0, 0.7, 0.65])?;

        assert!(svg.starts_with("<svg"));
        assert_eq!(svg.matches("<polyline").count(), 2);
        assert!(svg.contains("Training"));
        assert!(svg.contains("Validation"));
        assert!(svg.ends_with("</svg>\n"));

        Ok(())
    }

    #[test]
    fn handles_flat_and_empty_series() -> Result<(), fmt::Error> {
        let flat = render_loss_chart(&[0.5], &[0.5])?;
        let empty = render_loss_chart(&[], &[])?;

        assert!(!flat.contains("NaN"));
        assert!(!empty.contains("NaN"));

        Ok(())
    }

    #[test]
    fn saves_chart_to_file() -> anyhow::Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("loss.svg");

        save_loss_chart(&path, &[0.9, 0.4], &[1.0, 0.5])?;

        assert_eq!(
            std::fs::read_to_string(&path)?,
            render_loss_chart(&[0.9, 0.4], &[1.0, 0.5])?
        );

        Ok(())
    }
}
