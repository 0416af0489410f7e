pub mod crd;
pub mod labels;
pub mod machine;
