use bson::Document as BsonDocument;

/// A forward-only cursor over materialized query results.
#[derive(Debug, Clone, Default)]
pub struct Cursor {
    pub docs: Vec<BsonDocument>,
    pub pos: usize,
}

impl Cursor {
    #[must_use]
    pub const fn new(docs: Vec<BsonDocument>) -> Self {
        Self { docs, pos: 0 }
    }

    pub fn advance(&mut self) -> Option<BsonDocument> {
        let d = self.docs.get(self.pos)?.clone();
        self.pos += 1;
        Some(d)
    }

    #[must_use]
    pub fn remaining(&self) -> usize {
        self.docs.len().saturating_sub(self.pos)
    }

    #[must_use]
    pub fn to_vec(mut self) -> Vec<BsonDocument> {
        if self.pos == 0 {
            return self.docs;
        }
        self.docs.split_off(self.pos.min(self.docs.len()))
    }
}

impl Iterator for Cursor {
    type Item = BsonDocument;
    fn next(&mut self) -> Option<Self::Item> {
        self.advance()
    }
}
