//! Consensus constants for script evaluation

/// Maximum number of weighted instructions per contract execution
pub const MAX_INSTRUCTIONS: usize = 1024;

/// Maximum nesting depth of blocks, brackets and function calls
pub const MAX_STACK_DEPTH: usize = 64;

/// Maximum number of parameters a single function call may take
pub const MAX_FUNCTION_PARAMS: usize = 32;

/// Maximum size of a hex or string value produced by a built-in
pub const MAX_DATA_SIZE: usize = 65_536;

/// Cost charged on top of the base instruction for CHECKSIG
pub const CHECKSIG_EXTRA_COST: usize = 31;

/// Highest state variable port
pub const MAX_STATE_PORT: u8 = 255;

/// Fractional digits kept by numeric operations
pub const MAX_DECIMAL_PLACES: u32 = 44;

/// Integer digits a number may hold before overflowing
pub const MAX_NUMBER_DIGITS: usize = 64;

/// Maximum `$n` substitutions performed by FUNCTION
pub const MAX_FUNCTION_REPLACEMENTS: usize = 64;

/// Name of the variable FUNCTION reads its result from
pub const FUNCTION_RETURN_VARIABLE: &str = "returnvalue";

/// Token id of the native coin
pub const NATIVE_TOKEN_ID: [u8; 1] = [0x00];
