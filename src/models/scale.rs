/// The deck of legal vote magnitudes, in ascending order.
///
/// A modified Fibonacci sequence, shared by every session in the process.
/// Votes are not forced onto the deck at submission time; the consensus
/// calculation snaps the per-field mean onto it instead.
pub const ESTIMATION_SCALE: [i64; 8] = [1, 2, 3, 5, 8, 13, 21, 34];
