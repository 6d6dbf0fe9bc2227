//! A Hub-style `README.md` describing a fine-tuned model

use serde::Serialize;

use crate::pipelines::sequence_classification::{
    config::Training, text_classification::EvalReport,
};

static TEMPLATE: &str = r#"---
{{ front_matter }}---

# {{ model_name }} for sentiment classification

This model is [{{ model_name }}](https://huggingface.co/{{ model_name }}) fine-tuned on the `{{ dataset_name }}` dataset to classify text as one of {{ labels | size }} sentiments.

## Evaluation

Held-out split of {{ samples }} examples.

| Metric   | Value        |
|----------|--------------|
| Loss     | {{ loss }}     |
| Accuracy | {{ accuracy }} |

## Labels

{% for label in labels %}- `{{ forloop.index0 }}`: {{ label }}
{% endfor %}
## Training hyperparameters

- learning_rate: {{ learning_rate }}
- weight_decay: {{ weight_decay }}
- train_batch_size: {{ batch_size }}
- num_epochs: {{ num_epochs }}
- max_seq_length: {{ max_seq_length }}
- seed: {{ seed }}
"#;

#[derive(Serialize)]
struct FrontMatter<'a> {
    base_model: &'a str,
    datasets: Vec<&'a str>,
    library_name: &'static str,
    pipeline_tag: &'static str,
    tags: Vec<&'static str>,
    metrics: Vec<&'static str>,
}

#[derive(Serialize)]
struct Context<'a> {
    front_matter: String,
    model_name: &'a str,
    dataset_name: &'a str,
    labels: &'a [String],
    samples: usize,
    loss: String,
    accuracy: String,
    learning_rate: String,
    weight_decay: String,
    batch_size: usize,
    num_epochs: usize,
    max_seq_length: usize,
    seed: u64,
}

/// Render the model card for a finished training run
pub fn render(config: &Training, report: &EvalReport) -> anyhow::Result<String> {
    let front_matter = serde_yaml::to_string(&FrontMatter {
        base_model: &config.model_name,
        datasets: vec![&config.dataset_name],
        library_name: "burn",
        pipeline_tag: "text-classification",
        tags: vec!["sentiment-analysis", "generated_from_trainer"],
        metrics: vec!["accuracy"],
    })?;

    let context = liquid::to_object(&Context {
        front_matter,
        model_name: &config.model_name,
        dataset_name: &config.dataset_name,
        labels: &config.labels,
        samples: report.samples,
        loss: format!("{:.4}", report.loss),
        accuracy: format!("{:.4}", report.accuracy),
        learning_rate: config.learning_rate.to_string(),
        weight_decay: config.weight_decay.to_string(),
        batch_size: config.batch_size,
        num_epochs: config.num_epochs,
        max_seq_length: config.max_seq_length,
        seed: config.seed,
    })?;

    let template = liquid::ParserBuilder::with_stdlib()
        .build()?
        .parse(TEMPLATE)?;

    Ok(template.render(&context)?)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn renders_front_matter_and_metrics() {
        let config = Training::new(
            "distilgpt2".to_string(),
            "imdb".to_string(),
            vec!["negative".to_string(), "positive".to_string()],
        );
        let report = EvalReport::new(200, 0.41234, 0.875);

        let card = render(&config, &report).unwrap();

        let front_matter = card
            .strip_prefix("---\n")
            .and_then(|rest| rest.split("---\n").next())
            .unwrap();
        let yaml: serde_yaml::Value = serde_yaml::from_str(front_matter).unwrap();

        assert_eq!(yaml["base_model"].as_str(), Some("distilgpt2"));
        assert_eq!(yaml["pipeline_tag"].as_str(), Some("text-classification"));

        assert!(card.contains("| Accuracy | 0.8750 |"));
        assert!(card.contains("| Loss     | 0.4123     |"));
        assert!(card.contains("- `1`: positive"));
        assert!(card.contains("of 2 sentiments"));
        assert!(card.contains("Held-out split of 200 examples."));
        assert!(card.contains("- weight_decay: 0.01\n"));
    }
}
