//! Entry/exit tracing for controller operations, enabled with `--debug`.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TraceLine {
    pub depth: usize,
    pub text: String,
}

#[derive(Debug, Default)]
pub struct Tracer {
    enabled: bool,
    depth: usize,
}

impl Tracer {
    pub fn new(enabled: bool) -> Self {
        Self { enabled, depth: 0 }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn enter(&mut self, name: &str, args: &str) -> Option<TraceLine> {
        if !self.enabled {
            return None;
        }
        let line = TraceLine {
            depth: self.depth,
            text: format!("==> Entry: {name} with arguments: ({args})"),
        };
        self.depth += 1;
        Some(line)
    }

    pub fn exit(&mut self, name: &str, result: &str) -> Option<TraceLine> {
        if !self.enabled {
            return None;
        }
        self.depth = self.depth.saturating_sub(1);
        Some(TraceLine {
            depth: self.depth,
            text: format!("<== Exit: {name} with result: {result}"),
        })
    }
}
