// Catalog maintenance (refresh, list)
pub mod catalog;

// Orchestrated run of the selected playbooks
pub mod apply;

// Installed-state inspection and reset
pub mod installed;
