mod random;

pub use random::*;

#[cfg(test)]
pub mod test_utils;
