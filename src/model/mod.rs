pub mod bitvec;
pub mod blat;
pub mod evidence;
pub mod ids;
pub mod link;
pub mod thresholds;
pub mod vector;
