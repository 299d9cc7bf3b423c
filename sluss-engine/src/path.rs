//! Task paths: where in the tree a result came from.

/// Dotted location of a task node, e.g.
/// `scenario.serial[1].parallel[0].transfer`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskPath {
    segments: Vec<String>,
}

impl TaskPath {
    pub fn root() -> Self {
        Self {
            segments: vec!["scenario".to_string()],
        }
    }

    /// Path of child `index` under a `serial`/`parallel` block.
    pub fn child(&self, block: &str, index: usize) -> Self {
        let mut segments = self.segments.clone();
        segments.push(format!("{block}[{index}]"));
        Self { segments }
    }

    /// Path of a leaf, named by its task.
    pub fn leaf(&self, name: &str) -> Self {
        let mut segments = self.segments.clone();
        segments.push(name.to_string());
        Self { segments }
    }
}

impl std::fmt::Display for TaskPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.segments.join("."))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_dotted_path() {
        let path = TaskPath::root()
            .child("serial", 1)
            .child("parallel", 0)
            .leaf("transfer");
        assert_eq!(path.to_string(), "scenario.serial[1].parallel[0].transfer");
    }
}
