pub mod db_utils;
pub mod duration;
pub mod error;
pub mod extract;
pub mod slug;
