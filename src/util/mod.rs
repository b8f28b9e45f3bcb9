pub mod fresh_name;
