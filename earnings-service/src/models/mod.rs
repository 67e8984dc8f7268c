//! Domain models for earnings-service.

mod client;
mod company;
mod earnings;
mod invitation;
mod membership;
mod service;
mod stats;
mod transaction;
mod user;

pub use client::{Client, ClientDetail, ClientFilter, ClientVisit, CLIENT_HISTORY_LIMIT};
pub use company::{normalize_currency, Company, DEFAULT_CURRENCY};
pub use earnings::{
    ensure_amount, ensure_not_future, round_money, DailyEarnings, DayChanges, DayDetail,
    EntryMode,
};
pub use invitation::{Invitation, InvitationPreview, InvitationState, INVITATION_TTL_DAYS};
pub use membership::{validate_commission_rate, CompanyMember, Membership, Role};
pub use service::{CatalogService, PriceHistoryEntry, ServiceChanges};
pub use stats::{
    estimated_pay, CompanyStats, DailyPoint, DateBounds, EarningsTotals, EmployeeStats,
    EmployeeTotals, MyStats, ServicePopularity, StatsPeriod,
};
pub use transaction::{
    dedup_service_ids, ClientTransaction, DraftError, PaymentLine, PaymentMethod,
    ResolvedAmounts, TransactionDetail, TransactionDraft, TransactionInput, TransactionServiceLine,
};
pub use user::{normalize_email, User, UserProfile};
