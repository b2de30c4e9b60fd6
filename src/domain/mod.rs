pub mod category_code;
pub mod filter;
pub mod validation;
pub mod widget;
