/// Function-level source code dataset
pub mod functions;
