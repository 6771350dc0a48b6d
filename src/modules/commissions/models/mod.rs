pub mod commission_item;

pub use commission_item::{
    CommissionItem, CommissionItemDraft, CommissionItemFilter, CommissionItemStatus,
    CommissionSource, CommissionSummary, CreateCommissionItemRequest,
    ProfessionalCommissionSummary, ServiceCommissionSummary, UpdateCommissionItemRequest,
};
