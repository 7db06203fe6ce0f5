//! A compact prefix trie over function-name characters
//!
//! Names are folded to upper case and restricted to the ASCII band `.`
//! through `_`, which covers letters, digits, `.` and `_`. Nodes live in a
//! single arena; child links are indices into it.

const BAND_START: u8 = b'.';
const BAND_END: u8 = b'_';
const BAND_LEN: usize = (BAND_END - BAND_START + 1) as usize;

/// Slot for a character, `None` if it falls outside the band
fn slot(c: char) -> Option<usize> {
    if !c.is_ascii() {
        return None;
    }
    let b = (c as u8).to_ascii_uppercase();
    (BAND_START..=BAND_END)
        .contains(&b)
        .then(|| (b - BAND_START) as usize)
}

#[derive(Debug, Clone)]
struct Node {
    terminal: bool,
    children: [u32; BAND_LEN],
}

impl Node {
    // Index 0 is the root, so 0 doubles as "no child".
    const EMPTY: Node = Node {
        terminal: false,
        children: [0; BAND_LEN],
    };
}

/// Set of names supporting "does any name start here" checks
#[derive(Debug, Clone)]
pub struct PrefixTrie {
    nodes: Vec<Node>,
}

impl Default for PrefixTrie {
    fn default() -> Self {
        Self::new()
    }
}

impl PrefixTrie {
    /// Create an empty trie
    pub fn new() -> Self {
        Self {
            nodes: vec![Node::EMPTY],
        }
    }

    /// Build a trie from a list of names
    pub fn build<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut trie = Self::new();
        for name in names {
            trie.insert(name.as_ref());
        }
        trie
    }

    /// Add a name; empty names are ignored
    ///
    /// # Panics
    ///
    /// If the name contains a character outside the supported band.
    pub fn insert(&mut self, name: &str) {
        if name.is_empty() {
            return;
        }
        let mut node = 0usize;
        for c in name.chars() {
            let Some(s) = slot(c) else {
                panic!("character {:?} in {:?} is outside the trie band", c, name);
            };
            let next = self.nodes[node].children[s] as usize;
            node = if next == 0 {
                self.nodes.push(Node::EMPTY);
                let created = self.nodes.len() - 1;
                self.nodes[node].children[s] = created as u32;
                created
            } else {
                next
            };
        }
        self.nodes[node].terminal = true;
    }

    /// True if some inserted name is a prefix of `text`
    pub fn is_prefix_of(&self, text: &str) -> bool {
        let mut node = 0usize;
        for c in text.chars() {
            let Some(s) = slot(c) else {
                return false;
            };
            node = self.nodes[node].children[s] as usize;
            if node == 0 {
                return false;
            }
            if self.nodes[node].terminal {
                return true;
            }
        }
        false
    }

    /// True if some inserted name starts at any character offset of `text`
    pub fn occurs_in(&self, text: &str) -> bool {
        text.char_indices()
            .any(|(i, _)| self.is_prefix_of(&text[i..]))
    }

    /// Number of nodes, including the root
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prefix_match() {
        let trie = PrefixTrie::build(["CONCAT", "IFS"]);
        assert!(trie.is_prefix_of("CONCAT(A1)"));
        assert!(trie.is_prefix_of("concat"));
        assert!(trie.is_prefix_of("IFSX"));
        assert!(!trie.is_prefix_of("CONC"));
        assert!(!trie.is_prefix_of("IF("));
        assert!(!trie.is_prefix_of(""));
    }

    #[test]
    fn test_out_of_band_text_fails_fast() {
        let trie = PrefixTrie::build(["XOR"]);
        assert!(!trie.is_prefix_of("X{OR"));
        assert!(!trie.is_prefix_of("ø"));
    }

    #[test]
    fn test_occurs_in() {
        let trie = PrefixTrie::build(["XOR"]);
        assert!(trie.occurs_in("=1+xor(TRUE,FALSE)"));
        assert!(!trie.occurs_in("=SUM(A1:A3)"));
        assert!(trie.occurs_in("=\"ø\"&XOR(1)"));
    }

    #[test]
    fn test_shared_prefixes_share_nodes() {
        let trie = PrefixTrie::build(["T.DIST", "T.DIST.RT", "T.TEST", ""]);
        // root + "T." + "DIST" + ".RT" + "TEST"
        assert_eq!(trie.node_count(), 1 + 2 + 4 + 3 + 4);
        assert!(trie.is_prefix_of("T.DIST.2T"));
    }

    #[test]
    #[should_panic(expected = "outside the trie band")]
    fn test_insert_rejects_out_of_band_characters() {
        let mut trie = PrefixTrie::new();
        trie.insert("A{B");
    }
}
