//! Suggested opening questions shown before the first message.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Starter {
    pub label: String,
    pub message: String,
}

impl Starter {
    fn new(label: &str, message: &str) -> Self {
        Self {
            label: label.to_string(),
            message: message.to_string(),
        }
    }
}

pub fn default_starters() -> Vec<Starter> {
    vec![
        Starter::new(
            "What is the highest stock price for Illumina?",
            "What is the highest ever stock price for Illumina?",
        ),
        Starter::new(
            "NVIDIA overview",
            "Give me an overview of NVIDIA's share price from 2020-2024",
        ),
        Starter::new(
            "Longest bull run",
            "What is the longest running uptrend for Apple share prices?",
        ),
    ]
}
