/// Which side initiated a connection.
///
/// The outgoing side speaks first by sending a `join` frame, the incoming
/// side answers with a `peer` frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnDirection {
    Outgoing,
    Incoming,
}

impl std::fmt::Display for ConnDirection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConnDirection::Outgoing => write!(f, "outgoing"),
            ConnDirection::Incoming => write!(f, "incoming"),
        }
    }
}
