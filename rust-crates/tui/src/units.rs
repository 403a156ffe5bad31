pub const BASE_ASSET_DECIMALS: u32 = 9;
pub const BASE_ASSET_SYMBOL: &str = "ETH";

/// Renders an amount in the smallest unit as a decimal string. Trailing zeros
/// are trimmed but at least one fractional digit stays, so whole amounts read
/// `2.0`. With zero decimals the plain integer is returned.
pub fn format_units(amount: u64, decimals: u32) -> String {
    let digits = amount.to_string();
    let decimals = decimals as usize;
    if decimals == 0 {
        return digits;
    }
    let padded = format!("{digits:0>width$}", width = decimals + 1);
    let (whole, fraction) = padded.split_at(padded.len() - decimals);
    let fraction = match fraction.trim_end_matches('0') {
        "" => "0",
        trimmed => trimmed,
    };
    format!("{whole}.{fraction}")
}

pub fn format_base_asset(amount: u64) -> String {
    format_units(amount, BASE_ASSET_DECIMALS)
}
