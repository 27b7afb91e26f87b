//! Prompt rendering: the textual contract shared by training and evaluation.
//!
//! The target string states `Profitable: True` or `Profitable: False` on its
//! second line, ahead of any free-text field. The evaluator recovers labels
//! from generated text by searching for those literals, so their spelling
//! must never change.

use crate::domain::{FormattedExample, LabeledExample, Labels, TrainingExample};

pub const PROFITABLE_TRUE: &str = "Profitable: True";
pub const PROFITABLE_FALSE: &str = "Profitable: False";

/// Header preceding the instruction in training texts and generation prompts.
pub const INSTRUCTION_HEADER: &str = "### Instruction:\n";
/// Separator between the instruction and the response.
pub const RESPONSE_HEADER: &str = "\n\n### Response:\n";

/// Absolute PnL above which the market is labelled as trending.
pub const TRENDING_PNL_THRESHOLD: f64 = 1.0;

fn py_bool(value: bool) -> &'static str {
    if value {
        "True"
    } else {
        "False"
    }
}

/// `trending` when the attributed PnL moved more than a dollar either way.
pub fn market_regime(pnl: f64) -> &'static str {
    if pnl.abs() > TRENDING_PNL_THRESHOLD {
        "trending"
    } else {
        "ranging"
    }
}

/// Render the instruction: all ten features, the bot's decision, and the
/// prediction request.
pub fn render_instruction(example: &TrainingExample) -> String {
    let f = &example.input_features;
    format!(
        "Analyze this trading signal:\n\
         Price: ${:.2}\n\
         Volume: {:.2}\n\
         Volume Z-Score: {:.2}\n\
         Volatility: {:.3}\n\
         Body/ATR Ratio: {:.3}\n\
         Spread: {:.1} bps\n\
         Premium: {:.3}%\n\
         Realized Vol: {:.2}%\n\
         Open Interest: {:.2}\n\
         Funding Rate: {:.4}%\n\
         \n\
         AI Decision: {}\n\
         AI Confidence: {:.2}\n\
         E3 Trigger: {}\n\
         \n\
         Based on these market conditions, predict the trade outcome:",
        f.price,
        f.volume,
        f.volume_z,
        f.volatility,
        f.body_over_atr,
        f.spread_bps,
        f.premium_pct,
        f.realized_vol,
        f.open_interest,
        f.funding_rate,
        example.ai_decision,
        example.ai_confidence,
        example.e3_trigger,
    )
}

/// Render the target response from labels.
pub fn render_target(labels: &Labels) -> String {
    format!(
        "Trade Analysis:\n\
         Profitable: {}\n\
         Expected PnL: ${:.2}\n\
         Optimal Hold Time: {} minutes\n\
         Exit Strategy: {}\n\
         Market Regime: {}",
        py_bool(labels.profitable),
        labels.pnl,
        labels.hold_time,
        labels.exit_reason,
        market_regime(labels.pnl),
    )
}

pub fn format_example(example: &TrainingExample) -> LabeledExample {
    LabeledExample {
        example: FormattedExample {
            instruction: render_instruction(example),
            output: render_target(&example.labels),
            input: String::new(),
        },
        profitable: example.labels.profitable,
        timestamp: example.timestamp,
    }
}

pub fn format_examples(examples: &[TrainingExample]) -> Vec<LabeledExample> {
    examples.iter().map(format_example).collect()
}

/// Full causal-LM training text: prompt, response, then the end-of-sequence token.
pub fn training_text(example: &FormattedExample, eos_token: &str) -> String {
    format!(
        "{INSTRUCTION_HEADER}{}{RESPONSE_HEADER}{}{eos_token}",
        example.instruction, example.output
    )
}

/// Prompt handed to a generator at evaluation time; the model writes the response.
pub fn generation_prompt(instruction: &str) -> String {
    format!("{INSTRUCTION_HEADER}{instruction}{RESPONSE_HEADER}")
}

/// Recover a profitability label from rendered or generated text.
///
/// The first occurrence of `Profitable: True` or `Profitable: False` decides;
/// `None` when neither appears. Rendered targets state the label before any
/// free-text field, so an exit reason quoting either literal cannot flip it.
pub fn profitability(text: &str) -> Option<bool> {
    match (text.find(PROFITABLE_TRUE), text.find(PROFITABLE_FALSE)) {
        (Some(t), Some(f)) => Some(t < f),
        (Some(_), None) => Some(true),
        (None, Some(_)) => Some(false),
        (None, None) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Decision, InputFeatures};

    fn example(labels: Labels) -> TrainingExample {
        TrainingExample {
            timestamp: 1_700_000_000_000,
            input_features: InputFeatures {
                price: 142.567,
                volume: 1_250_000.0,
                volatility: 0.0234,
                body_over_atr: 0.87654,
                volume_z: 2.345,
                spread_bps: 3.25,
                premium_pct: 0.0412,
                realized_vol: 45.678,
                open_interest: 98_765.4321,
                funding_rate: 0.000125,
            },
            ai_decision: Decision::Long,
            ai_confidence: 0.8765,
            e3_trigger: "volume_spike".into(),
            labels,
        }
    }

    fn tp_labels() -> Labels {
        Labels {
            profitable: true,
            pnl: 12.5,
            hold_time: 30,
            exit_reason: "tp".into(),
        }
    }

    #[test]
    fn target_contains_contract_literals() {
        let target = render_target(&tp_labels());
        assert!(target.contains("Profitable: True"));
        assert!(target.contains("Expected PnL: $12.50"));
        assert!(target.contains("Optimal Hold Time: 30 minutes"));
        assert!(target.contains("Exit Strategy: tp"));
        assert!(target.contains("Market Regime: trending"));
        assert_eq!(profitability(&target), Some(true));
    }

    #[test]
    fn target_exact_shape() {
        let target = render_target(&Labels::no_trade());
        assert_eq!(
            target,
            "Trade Analysis:\n\
             Profitable: False\n\
             Expected PnL: $0.00\n\
             Optimal Hold Time: 0 minutes\n\
             Exit Strategy: no_trade\n\
             Market Regime: ranging"
        );
        assert_eq!(profitability(&target), Some(false));
    }

    #[test]
    fn negative_pnl_keeps_sign_after_dollar() {
        let labels = Labels {
            profitable: false,
            pnl: -3.456,
            hold_time: 60,
            exit_reason: "sl".into(),
        };
        let target = render_target(&labels);
        assert!(target.contains("Expected PnL: $-3.46"));
        assert!(target.contains("Market Regime: trending"));
    }

    #[test]
    fn regime_threshold_is_exclusive() {
        assert_eq!(market_regime(1.0), "ranging");
        assert_eq!(market_regime(-1.0), "ranging");
        assert_eq!(market_regime(1.01), "trending");
    }

    #[test]
    fn instruction_uses_fixed_precision() {
        let text = render_instruction(&example(tp_labels()));
        assert!(text.starts_with("Analyze this trading signal:\n"));
        assert!(text.contains("Price: $142.57\n"));
        assert!(text.contains("Volume Z-Score: 2.35\n"));
        assert!(text.contains("Body/ATR Ratio: 0.877\n"));
        assert!(text.contains("Spread: 3.2 bps\n"));
        assert!(text.contains("Premium: 0.041%\n"));
        assert!(text.contains("Realized Vol: 45.68%\n"));
        assert!(text.contains("Funding Rate: 0.0001%\n"));
        assert!(text.contains("Volatility: 0.023\n"));
        assert!(text.contains("Open Interest: 98765.43\n"));
        assert!(text.contains("AI Decision: LONG\n"));
        assert!(text.contains("AI Confidence: 0.88\n"));
        assert!(text.contains("E3 Trigger: volume_spike\n"));
        assert!(text.ends_with("predict the trade outcome:"));
    }

    #[test]
    fn format_example_carries_typed_label() {
        let labeled = format_example(&example(tp_labels()));
        assert!(labeled.profitable);
        assert!(labeled.example.input.is_empty());
        assert_eq!(profitability(&labeled.example.output), Some(labeled.profitable));
    }

    #[test]
    fn exit_reason_quoting_a_label_cannot_flip_it() {
        let labels = Labels {
            profitable: false,
            pnl: -4.0,
            hold_time: 60,
            exit_reason: "manual (Profitable: True override)".into(),
        };
        let target = render_target(&labels);
        assert_eq!(profitability(&target), Some(false));

        let labels = Labels {
            profitable: true,
            exit_reason: "Profitable: False".into(),
            ..tp_labels()
        };
        assert_eq!(profitability(&render_target(&labels)), Some(true));
    }

    #[test]
    fn earliest_literal_wins_in_generated_text() {
        assert_eq!(
            profitability("Profitable: False. Earlier I said Profitable: True"),
            Some(false)
        );
        assert_eq!(profitability("Profitable: True\nProfitable: False"), Some(true));
    }

    #[test]
    fn profitability_absent_when_no_literal() {
        assert_eq!(profitability("the trade will probably work"), None);
        assert_eq!(profitability("profitable: true"), None);
    }

    #[test]
    fn training_text_wraps_prompt_and_response() {
        let ex = FormattedExample {
            instruction: "Q".into(),
            output: "A".into(),
            input: String::new(),
        };
        assert_eq!(training_text(&ex, "</s>"), "### Instruction:\nQ\n\n### Response:\nA</s>");
        assert_eq!(generation_prompt("Q"), "### Instruction:\nQ\n\n### Response:\n");
    }
}
