//! Canned task instructions the model fetches by id

use serde::{Deserialize, Serialize};

/// Id of the treasury-bills vs retail-sales analysis procedure
pub const FINANCIAL_ADVISOR_INSTRUCTION_ID: i64 = 1;

pub const FINANCIAL_ADVISOR_INSTRUCTIONS: &str = concat!(
    "To recommend whether the user should invest in treasury bills or in retail sales, you should know the timeframe of the data the user wants you to analyse to come up with the conclusion.",
    "If the user has not mentioned a timeframe, ask him to name a starting month and an ending month which are not more than 6 months apart and are within the last 1 year.",
    "Next, retrieve the treasury yield data and the retail sales data using function calling. Use 'US' as the country code for both as we are only concerned with the United States.",
    "Analyze both the data and isolate the data that fall within the starting month and ending month that the user stated.",
    "If the treasury yield are generally rising within that time frame, recommend that investing in treasury bonds is a good investment and state reason why you think so.",
    "If the treasury yield are generally decreasing within that time frame, recommend that investing in treasury bonds is a bad investment and state reason why you think so",
    "if the retail sales are generally rising within that time frame, recommend that investing in retail is a good investment and state reason why you think so.",
    "If the retail sales are generally decreasing within that time frame, recommend that investing in retail sales is a bad investment and state reason why you think so.",
    "It may be possible that both treasury yields and retail sales are a bad investment, both a good investment or one is a good investment while the other is a bad investment. If that is ",
    "the case, reply stating that they are both good investments but since treasury bonds are backed by the government, they should invest in it rather than the retail sector.",
    "Regardless of which investment is better, justify your answers with the data you used for the analysis. Always give a certain answer.",
);

/// A single immutable instruction record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instruction {
    pub id: i64,
    pub text: &'static str,
}

/// Fixed lookup table of instructions, built once at startup
#[derive(Debug, Clone)]
pub struct InstructionBook {
    entries: Vec<Instruction>,
}

impl InstructionBook {
    pub fn new(entries: Vec<Instruction>) -> Self {
        Self { entries }
    }

    /// Unknown ids are not an error; the caller gets `None`.
    pub fn lookup(&self, id: i64) -> Option<&Instruction> {
        self.entries.iter().find(|entry| entry.id == id)
    }
}

impl Default for InstructionBook {
    fn default() -> Self {
        Self::new(vec![Instruction {
            id: FINANCIAL_ADVISOR_INSTRUCTION_ID,
            text: FINANCIAL_ADVISOR_INSTRUCTIONS,
        }])
    }
}

/// Wire shape handed back to the model for a hit
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct InstructionPayload {
    pub instructions: String,
}

impl From<&Instruction> for InstructionPayload {
    fn from(instruction: &Instruction) -> Self {
        Self {
            instructions: instruction.text.to_string(),
        }
    }
}
