pub mod asset_view;
pub mod contract;
