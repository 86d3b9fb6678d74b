//! Stage pipeline - the ordered vocabulary of order progress
//!
//! Pipelines are configuration, not protocol: a delivery order and a dine-in
//! order can run different pipelines against the same engine.

use thiserror::Error;

/// Pipeline construction error
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    /// A pipeline needs at least one stage
    #[error("pipeline has no stages")]
    Empty,

    /// Stage names must be unique within a pipeline
    #[error("duplicate stage: {0}")]
    Duplicate(String),
}

/// Ordered, duplicate-free sequence of stage names
///
/// Lookup is by exact name; a stage the pipeline does not know yields `None`
/// rather than an error, so servers can introduce stages ahead of clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StagePipeline {
    stages: Vec<String>,
}

impl StagePipeline {
    /// Build a pipeline from ordered stage names.
    pub fn new<I, S>(stages: I) -> Result<Self, PipelineError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let stages: Vec<String> = stages.into_iter().map(Into::into).collect();
        if stages.is_empty() {
            return Err(PipelineError::Empty);
        }
        for (i, stage) in stages.iter().enumerate() {
            if stages[..i].contains(stage) {
                return Err(PipelineError::Duplicate(stage.clone()));
            }
        }
        Ok(Self { stages })
    }

    /// The standard delivery pipeline used by the ordering backend.
    pub fn delivery() -> Self {
        Self {
            stages: vec![
                "Order Received".to_string(),
                "Preparing".to_string(),
                "Out for Delivery".to_string(),
                "Delivered".to_string(),
            ],
        }
    }

    /// Position of `stage`, or `None` when the pipeline does not know it.
    pub fn index_of(&self, stage: &str) -> Option<usize> {
        self.stages.iter().position(|s| s == stage)
    }

    /// The final stage of the pipeline.
    pub fn terminal(&self) -> &str {
        self.stages
            .last()
            .expect("pipeline is never empty")
            .as_str()
    }

    /// Whether `stage` is the final stage.
    pub fn is_terminal(&self, stage: &str) -> bool {
        self.terminal() == stage
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Stage names in pipeline order.
    pub fn stages(&self) -> impl Iterator<Item = &str> {
        self.stages.iter().map(String::as_str)
    }
}

impl Default for StagePipeline {
    fn default() -> Self {
        Self::delivery()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_index_of_in_order() {
        let pipeline = StagePipeline::delivery();
        assert_eq!(pipeline.index_of("Order Received"), Some(0));
        assert_eq!(pipeline.index_of("Preparing"), Some(1));
        assert_eq!(pipeline.index_of("Out for Delivery"), Some(2));
        assert_eq!(pipeline.index_of("Delivered"), Some(3));
    }

    #[test]
    fn test_index_of_unknown_stage() {
        let pipeline = StagePipeline::delivery();
        assert_eq!(pipeline.index_of("Refunded"), None);
        assert_eq!(pipeline.index_of(""), None);
    }

    #[test]
    fn test_terminal_stage() {
        let pipeline = StagePipeline::delivery();
        assert_eq!(pipeline.terminal(), "Delivered");
        assert!(pipeline.is_terminal("Delivered"));
        assert!(!pipeline.is_terminal("Preparing"));
    }

    #[test]
    fn test_custom_pipeline() {
        let pipeline = StagePipeline::new(["Received", "Served"]).unwrap();
        assert_eq!(pipeline.len(), 2);
        assert_eq!(pipeline.index_of("Served"), Some(1));
        assert_eq!(pipeline.terminal(), "Served");
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(
            StagePipeline::new(Vec::<String>::new()),
            Err(PipelineError::Empty)
        );
    }

    #[test]
    fn test_rejects_duplicates() {
        let err = StagePipeline::new(["Received", "Preparing", "Received"]).unwrap_err();
        assert_eq!(err, PipelineError::Duplicate("Received".to_string()));
    }
}
