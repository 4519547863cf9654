/// Ordered table of class labels, index-aligned with the confidence vector
/// the network produces.
///
/// The table's length is fixed for the lifetime of a pipeline; it defines
/// the only confidence-vector length the pipeline accepts.
#[derive(Debug, Clone)]
pub struct LabelTable {
    labels: Vec<String>,
}

impl LabelTable {
    pub fn new(labels: Vec<String>) -> Self {
        Self { labels }
    }

    /// Build a table from newline-separated label text, one label per line.
    /// Line order defines the class index.
    pub fn from_lines(text: &str) -> Self {
        Self {
            labels: text.lines().map(|line| line.trim_end().to_string()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&str> {
        self.labels.get(index).map(String::as_str)
    }

    pub fn as_slice(&self) -> &[String] {
        &self.labels
    }
}
