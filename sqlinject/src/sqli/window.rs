use crate::sqli::Token;
use crate::Error;

/// Slots in the folding window: five significant tokens plus lookahead.
pub const WINDOW_CAPACITY: usize = 8;

/// Fixed-size token buffer used by the folding engine.
///
/// The folding engine tracks its own `pos` (next free slot); the window only
/// knows about slots. Removal shifts every later slot down and clears the
/// vacated tail, so tokens beyond the folded pair keep their order.
#[derive(Debug, Clone)]
pub struct TokenWindow {
    slots: [Token; WINDOW_CAPACITY],
}

impl Default for TokenWindow {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenWindow {
    pub const fn new() -> Self {
        Self {
            slots: [Token::new(); WINDOW_CAPACITY],
        }
    }

    pub fn clear(&mut self) {
        for slot in &mut self.slots {
            slot.clear();
        }
    }

    pub fn get(&self, index: usize) -> Result<&Token, Error> {
        self.slots.get(index).ok_or(Error::WindowIndex {
            index,
            capacity: WINDOW_CAPACITY,
        })
    }

    pub fn get_mut(&mut self, index: usize) -> Result<&mut Token, Error> {
        self.slots.get_mut(index).ok_or(Error::WindowIndex {
            index,
            capacity: WINDOW_CAPACITY,
        })
    }

    pub fn set(&mut self, index: usize, token: Token) -> Result<(), Error> {
        *self.get_mut(index)? = token;
        Ok(())
    }

    /// Copies slot `from` over slot `to`.
    pub fn copy(&mut self, from: usize, to: usize) -> Result<(), Error> {
        let token = *self.get(from)?;
        self.set(to, token)
    }

    /// Removes `count` slots starting at `start`, shifting `start + count..`
    /// down. `pos` is the caller's fill mark; the new mark is returned.
    pub fn remove_range(
        &mut self,
        rule: &'static str,
        pos: usize,
        start: usize,
        count: usize,
    ) -> Result<usize, Error> {
        start
            .checked_add(count)
            .filter(|&end| end <= pos)
            .ok_or(Error::WindowUnderflow {
                rule,
                pos,
                needed: start.saturating_add(count),
            })?;
        if pos > WINDOW_CAPACITY {
            return Err(Error::WindowIndex {
                index: pos,
                capacity: WINDOW_CAPACITY,
            });
        }
        if let Some(live) = self.slots.get_mut(start..pos) {
            live.rotate_left(count);
        }
        let new_pos = pos - count;
        if let Some(tail) = self.slots.get_mut(new_pos..pos) {
            for slot in tail {
                slot.clear();
            }
        }
        Ok(new_pos)
    }

    pub fn remove(&mut self, rule: &'static str, pos: usize, index: usize) -> Result<usize, Error> {
        self.remove_range(rule, pos, index, 1)
    }

    pub fn as_slice(&self) -> &[Token] {
        &self.slots
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;
    use crate::sqli::TokenType;

    fn window_of(types: &[TokenType]) -> TokenWindow {
        let mut window = TokenWindow::new();
        for (i, &t) in types.iter().enumerate() {
            let mut token = Token::new();
            token.assign(t, i, 1, &[t.as_byte()]);
            window.set(i, token).unwrap();
        }
        window
    }

    fn types(window: &TokenWindow, pos: usize) -> String {
        window.as_slice()[..pos]
            .iter()
            .map(|t| t.token_type.to_char())
            .collect()
    }

    #[test]
    fn remove_shifts_later_slots_down() {
        let mut window = window_of(&[
            TokenType::String,
            TokenType::String,
            TokenType::Operator,
            TokenType::Number,
        ]);
        let pos = window.remove("ss", 4, 1).unwrap();
        assert_eq!(pos, 3);
        assert_eq!(types(&window, pos), "so1");
        assert!(window.get(3).unwrap().is_none());
    }

    #[test]
    fn remove_range_drops_a_run() {
        let mut window = window_of(&[
            TokenType::Number,
            TokenType::Comma,
            TokenType::Operator,
            TokenType::Number,
            TokenType::Keyword,
        ]);
        let pos = window.remove_range("comma-unary", 5, 1, 3).unwrap();
        assert_eq!(pos, 2);
        assert_eq!(types(&window, pos), "1k");
    }

    #[test]
    fn underflow_is_an_error() {
        let mut window = window_of(&[TokenType::Number, TokenType::Comma]);
        let err = window.remove_range("comma-unary", 2, 0, 3).unwrap_err();
        assert_eq!(
            err,
            Error::WindowUnderflow {
                rule: "comma-unary",
                pos: 2,
                needed: 3
            }
        );
    }

    #[test]
    fn out_of_range_slot() {
        let window = TokenWindow::new();
        assert!(matches!(
            window.get(WINDOW_CAPACITY),
            Err(Error::WindowIndex { index: 8, capacity: 8 })
        ));
    }
}
