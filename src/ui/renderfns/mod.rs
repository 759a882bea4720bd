pub mod footer;
pub mod header;
pub mod utils;

pub use footer::{cache_status, draw_footer};
pub use header::draw_header;
pub use utils::{
  empty_message, format_age, format_amount, format_fiat, query_title, ticket_status_color,
  truncate,
};
