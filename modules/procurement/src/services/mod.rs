pub mod grn_service;
pub mod po_service;
pub mod pr_service;
