pub mod memory;
pub mod sqlite;

#[cfg(test)]
mod contract;
