pub mod benchmark;
pub mod interest;
pub mod publish;
pub mod serve;
