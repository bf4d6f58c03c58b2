//! Convert command - unit conversion.

use anyhow::{Result, bail};
use clap::Args;

use crate::tools::convert;

#[derive(Args)]
pub struct ConvertCmd {
    #[arg(allow_negative_numbers = true)]
    pub value: f64,

    /// Source unit (e.g., celsius, km, lb)
    pub from: String,

    /// Target unit
    pub to: String,
}

impl ConvertCmd {
    pub async fn run(&self) -> Result<()> {
        let result = convert::convert_unit(self.value, &self.from, &self.to);
        if result.is_nan() {
            bail!("Cannot convert {} to {}", self.from, self.to);
        }

        println!("{} {} = {} {}", self.value, self.from, result, self.to);
        Ok(())
    }
}
