use async_trait::async_trait;

/// Output side of the host chat framework.
#[async_trait]
pub trait ResponseSink: Send {
    async fn emit_text(&mut self, text: &str);
    async fn emit_image(&mut self, url: &str);
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Text(String),
    Image(String),
}

/// Collects segments into one reply, for hosts that send a message chain at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageChain {
    pub segments: Vec<Segment>,
}

impl MessageChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn image_urls(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Image(url) => Some(url.as_str()),
            Segment::Text(_) => None,
        })
    }

    pub fn text(&self) -> String {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Text(t) => Some(t.as_str()),
                Segment::Image(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[async_trait]
impl ResponseSink for MessageChain {
    async fn emit_text(&mut self, text: &str) {
        self.segments.push(Segment::Text(text.to_string()));
    }

    async fn emit_image(&mut self, url: &str) {
        self.segments.push(Segment::Image(url.to_string()));
    }
}
