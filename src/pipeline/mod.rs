pub mod stage1_correlation;
pub mod stage2_aggregate;
pub mod stage3_links;
pub mod stage4_blat;
pub mod stage5_report;
