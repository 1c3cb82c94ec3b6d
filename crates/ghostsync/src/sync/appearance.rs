use crate::scene::BodyParts;

const BODY_PARTS_MASK: u32 = 0x7FFF;

/// Number of selectable hair, jaw and arm kits for one body type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KitCounts {
    pub hair: u16,
    pub jaw: u16,
    pub arms: u16,
}

impl KitCounts {
    fn radices(&self) -> [u32; 3] {
        [self.hair, self.jaw, self.arms].map(|count| count.max(1) as u32)
    }
}

/// Packs the three body part selections into one mixed-radix number so they
/// fit the 15 bits an appearance record leaves for them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BodyPartKits {
    pub male: KitCounts,
    pub female: KitCounts,
}

impl Default for BodyPartKits {
    fn default() -> Self {
        Self {
            male: KitCounts {
                hair: 25,
                jaw: 16,
                arms: 13,
            },
            female: KitCounts {
                hair: 28,
                jaw: 4,
                arms: 13,
            },
        }
    }
}

impl BodyPartKits {
    pub fn counts(&self, is_female: bool) -> KitCounts {
        if is_female { self.female } else { self.male }
    }

    pub fn pack(&self, parts: &BodyParts, is_female: bool) -> u16 {
        let [hair, jaw, _] = self.counts(is_female).radices();
        let [p0, p1, p2] = parts.map(u32::from);
        let packed = p0 + p1 * hair + p2 * hair * jaw;
        (packed & BODY_PARTS_MASK) as u16
    }

    pub fn unpack(&self, packed: u16, is_female: bool) -> BodyParts {
        let [hair, jaw, arms] = self.counts(is_female).radices();
        let mut rest = packed as u32 & BODY_PARTS_MASK;

        let p0 = rest % hair;
        rest /= hair;
        let p1 = rest % jaw;
        rest /= jaw;
        let p2 = rest % arms;

        [p0 as u16, p1 as u16, p2 as u16]
    }
}
