/// Generational handle: `(index, generation)`.
///
/// A handle stays valid only while the slot at `index` still holds the same
/// `generation`; once the slot is freed and reused, old handles stop matching.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Handle(u32, u32);

impl Handle {
    pub fn new(index: u32, generation: u32) -> Self {
        Handle(index, generation)
    }

    pub fn index(&self) -> u32 {
        self.0
    }

    pub fn generation(&self) -> u32 {
        self.1
    }
}
