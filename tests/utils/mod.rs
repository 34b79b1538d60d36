#![allow(dead_code)]

pub mod prevalidation;
pub mod test_env;
