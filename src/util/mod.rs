pub mod errors;
pub mod jwt;
#[cfg(test)]
pub mod testing;
