pub mod alias;
pub mod array;
pub mod compare;
pub mod convert;
pub mod object;
pub mod serde_impl;
pub mod string;
pub mod value;
pub mod variables;
