//! Coin-symbol interning: maps a symbol to a stable numeric index for
//! volume bucketing. Stands in for the node-wide price registry.

use std::sync::RwLock;

#[derive(Debug, Default)]
pub struct SymbolRegistry {
    symbols: RwLock<Vec<String>>,
}

impl SymbolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index for a symbol, assigning the next free slot on first sight.
    pub fn intern(&self, symbol: &str) -> usize {
        if let Some(index) = self.index_of(symbol) {
            return index;
        }
        let mut symbols = self.symbols.write().unwrap();
        // A racing writer may have added it between the read and the write.
        if let Some(index) = symbols.iter().position(|s| s == symbol) {
            return index;
        }
        symbols.push(symbol.to_string());
        symbols.len() - 1
    }

    pub fn index_of(&self, symbol: &str) -> Option<usize> {
        self.symbols
            .read()
            .unwrap()
            .iter()
            .position(|s| s == symbol)
    }

    pub fn symbol(&self, index: usize) -> Option<String> {
        self.symbols.read().unwrap().get(index).cloned()
    }

    pub fn len(&self) -> usize {
        self.symbols.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
