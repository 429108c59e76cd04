pub mod reference_ledger;
pub mod reference_scope;
