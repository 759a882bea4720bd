mod balances;
mod notifications;
mod profile;
mod ticket_detail;
mod tickets;

pub use balances::BalancesView;
pub use notifications::NotificationsView;
pub use profile::ProfileView;
pub use ticket_detail::TicketDetailView;
pub use tickets::TicketsView;
