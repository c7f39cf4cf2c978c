use std::collections::VecDeque;

pub const DEFAULT_CAPACITY: usize = 500;

/// Bounded line buffer. Oldest lines are evicted once `capacity` is exceeded.
#[derive(Debug, Clone)]
pub struct LogRing {
	lines: VecDeque<String>,
	capacity: usize,
}

impl LogRing {
	pub fn new(capacity: usize) -> Self {
		let capacity = capacity.max(1);
		Self {
			lines: VecDeque::with_capacity(capacity),
			capacity,
		}
	}

	pub fn push(&mut self, line: String) {
		self.lines.push_back(line);
		while self.lines.len() > self.capacity {
			self.lines.pop_front();
		}
	}

	pub fn snapshot(&self) -> Vec<String> {
		self.lines.iter().cloned().collect()
	}

	pub fn clear(&mut self) {
		self.lines.clear();
	}

	pub fn len(&self) -> usize {
		self.lines.len()
	}

	pub fn is_empty(&self) -> bool {
		self.lines.is_empty()
	}

	pub fn capacity(&self) -> usize {
		self.capacity
	}
}

impl Default for LogRing {
	fn default() -> Self {
		Self::new(DEFAULT_CAPACITY)
	}
}
