pub mod apply;
pub mod block;
pub mod commands;
pub mod doctor;
pub mod error;
pub mod fs_utils;
pub mod paths;
pub mod profile;
pub mod shell;
pub mod store;
pub mod ui;

#[cfg(test)]
pub mod test_utils;
