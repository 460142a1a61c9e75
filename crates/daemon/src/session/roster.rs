/// Who is in the meeting, as last reported by the room
///
/// The room sends the full guest list with every join and leave, so the
/// roster is replaced wholesale rather than patched. Guest names are kept as
/// sent, even one that matches the host's.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Roster {
    host: String,
    guests: Vec<String>,
}

impl Roster {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            guests: Vec::new(),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn guests(&self) -> &[String] {
        &self.guests
    }

    /// Replace the guest list; returns whether it changed
    pub fn rebuild(&mut self, guests: Vec<String>) -> bool {
        let mut deduped: Vec<String> = Vec::with_capacity(guests.len());
        for guest in guests {
            if !deduped.contains(&guest) {
                deduped.push(guest);
            }
        }

        if deduped == self.guests {
            return false;
        }
        self.guests = deduped;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_roster_mirrors_last_list() {
        let mut roster = Roster::new("Alice");
        assert!(roster.rebuild(names(&["Bob", "Carol"])));
        assert!(!roster.rebuild(names(&["Bob", "Carol"])));

        // Bob left; the previous state does not leak through
        assert!(roster.rebuild(names(&["Carol"])));
        assert_eq!(roster.guests(), names(&["Carol"]).as_slice());
        assert_eq!(roster.host(), "Alice");
    }

    #[test]
    fn test_roster_drops_duplicates() {
        let mut roster = Roster::new("Alice");
        roster.rebuild(names(&["Bob", "Carol", "Bob"]));
        assert_eq!(roster.guests(), names(&["Bob", "Carol"]).as_slice());
    }

    #[test]
    fn test_guest_sharing_the_host_name_is_kept() {
        let mut roster = Roster::new("Alice");
        assert!(roster.rebuild(names(&["Alice", "Bob"])));
        assert_eq!(roster.guests(), names(&["Alice", "Bob"]).as_slice());
    }
}
