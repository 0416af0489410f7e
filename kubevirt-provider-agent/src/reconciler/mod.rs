pub mod controlplane;
pub mod error;
pub mod infrastructure;
pub mod worker;

#[cfg(test)]
pub(crate) mod testing;
