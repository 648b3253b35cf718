use alloy_primitives::{
   FixedBytes, U256,
   utils::{ParseUnits, format_units, parse_units},
};
use anyhow::bail;
use serde::{Deserialize, Serialize};

/// Encode a human-readable name into the contract's fixed-length representation.
///
/// The string is stored as UTF-8 bytes, zero-padded to 32 bytes. The last byte
/// is always zero, so anything longer than 31 bytes is an error.
pub fn encode_bytes32_string(text: &str) -> Result<FixedBytes<32>, anyhow::Error> {
   let bytes = text.as_bytes();
   if bytes.len() > 31 {
      bail!("bytes32 strings must be at most 31 bytes long");
   }

   let mut out = [0u8; 32];
   out[..bytes.len()].copy_from_slice(bytes);
   Ok(FixedBytes::from(out))
}

/// Decode a fixed-length encoded name back into a human-readable string.
///
/// Reads up to the first zero byte. An all-zero value decodes to the empty string.
pub fn decode_bytes32_string(raw: &FixedBytes<32>) -> Result<String, anyhow::Error> {
   if raw[31] != 0 {
      bail!("invalid bytes32 string, no null terminator");
   }

   // raw[31] == 0, so a zero byte always exists
   let end = raw.iter().position(|b| *b == 0).unwrap_or(31);
   let text = std::str::from_utf8(&raw[..end])?;
   Ok(text.to_string())
}

fn get_decimal_position(x: f64) -> usize {
   let sci = format!("{:e}", x);
   if let Some(exp_str) = sci.split('e').nth(1) {
      if let Ok(exp) = exp_str.parse::<i32>() {
         if exp < 0 {
            return (-exp) as usize;
         }
      }
   }
   1
}

fn leading_zeros_after_decimal(x: f64) -> usize {
   let position = get_decimal_position(x);
   position.saturating_sub(1)
}

fn add_comma_separators(number: &str) -> String {
   let mut parts = number.splitn(2, '.');
   let integer_part = parts.next().unwrap_or("0");
   let decimal_part = parts.next().unwrap_or("");

   let mut result = String::new();
   let chars: Vec<char> = integer_part.chars().rev().collect();
   for (i, c) in chars.iter().enumerate() {
      if i > 0 && i % 3 == 0 {
         result.insert(0, ',');
      }
      result.insert(0, *c);
   }

   if !decimal_part.is_empty() {
      result.push('.');
      result.push_str(decimal_part);
   }

   result
}

fn remove_trailing_zeros(mut s: String) -> String {
   while s.ends_with('0') {
      s.pop();
   }

   if s.ends_with('.') {
      s.pop();
   }
   s
}

fn format_number(n: f64) -> String {
   let zeros = leading_zeros_after_decimal(n);

   // For very small numbers starting from 0.00
   if zeros > 1 {
      let prec = (zeros + 4).min(15);
      let s = format!("{:.prec$}", n);
      remove_trailing_zeros(s)

      // From 10k start adding commas
   } else if n > 9999.0 {
      let s = format!("{:.2}", n);
      add_comma_separators(&s)
   } else {
      format!("{:.2}", n)
   }
}

/// A wei amount along with readable representations of it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NumericValue {
   pub wei: U256,
   pub f64: f64,
   pub formatted: String,
}

impl Default for NumericValue {
   fn default() -> Self {
      Self {
         wei: U256::ZERO,
         f64: 0.0,
         formatted: String::from("0.00"),
      }
   }
}

impl NumericValue {
   /// Format a wei value to a readable format
   ///
   /// Example:
   /// ```
   /// use alloy_primitives::U256;
   /// use eth_bank::utils::NumericValue;
   ///
   /// // 1 ETH in wei
   /// let wei = U256::from(1000000000000000000u128);
   /// let value = NumericValue::format_wei(wei, 18);
   /// assert_eq!(value.f64(), 1.0);
   /// ```
   pub fn format_wei(wei: U256, decimals: u8) -> Self {
      let units_formatted = format_units(wei, decimals).unwrap_or("0".to_string());
      let f64 = units_formatted.parse().unwrap_or(0.0);
      let formatted = format_number(f64);

      Self {
         wei,
         f64,
         formatted,
      }
   }

   /// Parse a value doing the 10^decimals conversion
   ///
   /// Unparseable or negative input becomes zero, use
   /// [crate::session::BankSession] for validated amount handling.
   pub fn parse_to_wei(amount: &str, currency_decimals: u8) -> Self {
      let wei = match parse_units(amount, currency_decimals) {
         Ok(ParseUnits::U256(wei)) => wei,
         Ok(ParseUnits::I256(_)) | Err(_) => U256::ZERO,
      };

      Self::format_wei(wei, currency_decimals)
   }

   pub fn is_zero(&self) -> bool {
      self.wei == U256::ZERO
   }

   pub fn wei(&self) -> U256 {
      self.wei
   }

   pub fn f64(&self) -> f64 {
      self.f64
   }

   pub fn formatted(&self) -> String {
      self.formatted.clone()
   }
}
