mod tensor;

pub use tensor::*;
