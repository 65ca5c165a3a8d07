//! crates/tahfiz_core/src/quran.rs
//!
//! Static Quran reference data and the verse-range math built on it:
//! juz lookup, juz-boundary splitting, and range merging. Everything in
//! this module is pure; the tables are process-wide constants.

use crate::domain::DomainError;

/// Revelation category of a surah.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Revelation {
    Meccan,
    Medinan,
}

/// One of the 114 fixed top-level divisions of the text.
#[derive(Debug, Clone, Copy)]
pub struct Surah {
    pub number: u16,
    pub name: &'static str,
    pub meaning: &'static str,
    pub verse_count: u16,
    pub revelation: Revelation,
}

impl Surah {
    /// Looks up a surah by its 1-based number.
    pub fn by_number(number: u16) -> Option<&'static Surah> {
        if (1..=114).contains(&number) {
            Some(&SURAHS[number as usize - 1])
        } else {
            None
        }
    }

    /// Like [`Surah::by_number`] but mapping a miss to a domain error.
    pub fn get(number: u16) -> Result<&'static Surah, DomainError> {
        Surah::by_number(number).ok_or(DomainError::InvalidSurah(number))
    }
}

/// A contiguous inclusive range of verses within a single surah.
///
/// Invariant: `1 <= from_verse <= to_verse <= surah.verse_count`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerseRange {
    pub from_verse: u16,
    pub to_verse: u16,
}

impl VerseRange {
    /// Validates and builds a range against the surah's verse count.
    pub fn new(surah: &Surah, from_verse: u16, to_verse: u16) -> Result<Self, DomainError> {
        if from_verse < 1 || to_verse > surah.verse_count || from_verse > to_verse {
            return Err(DomainError::InvalidVerseRange {
                from: from_verse,
                to: to_verse,
                max: surah.verse_count,
            });
        }
        Ok(Self {
            from_verse,
            to_verse,
        })
    }

    /// Builds a range that is already known to satisfy the invariant
    /// (boundary tables, rows read back from storage).
    pub const fn raw(from_verse: u16, to_verse: u16) -> Self {
        Self {
            from_verse,
            to_verse,
        }
    }

    /// Bounding envelope of the two ranges: `{min from, max to}`.
    ///
    /// Deliberately not a set union - a gap between disjoint ranges is
    /// bridged, because the ledger stores one range per (surah, juz) group.
    /// Commutative and idempotent.
    pub fn merge(self, other: VerseRange) -> VerseRange {
        VerseRange {
            from_verse: self.from_verse.min(other.from_verse),
            to_verse: self.to_verse.max(other.to_verse),
        }
    }

    pub fn verse_count(self) -> u16 {
        self.to_verse - self.from_verse + 1
    }
}

/// (surah, verse) start boundary of each of the 30 ajza.
///
/// Juz N runs from `JUZ_STARTS[N-1]` up to one verse before
/// `JUZ_STARTS[N]`; juz 30 ends at the final verse of surah 114.
pub const JUZ_STARTS: [(u16, u16); 30] = [
    (1, 1),
    (2, 142),
    (2, 253),
    (3, 93),
    (4, 24),
    (4, 148),
    (5, 82),
    (6, 111),
    (7, 88),
    (8, 41),
    (9, 93),
    (11, 6),
    (12, 53),
    (15, 1),
    (17, 1),
    (18, 75),
    (21, 1),
    (23, 1),
    (25, 21),
    (27, 56),
    (29, 46),
    (33, 31),
    (36, 28),
    (39, 32),
    (41, 47),
    (46, 1),
    (51, 31),
    (58, 1),
    (67, 1),
    (78, 1),
];

/// Returns the juz containing (surah, verse).
///
/// Scans the boundary table from the last entry down and returns the
/// highest-numbered juz whose start is at or before the position, under
/// the ordering "surah ascending, then verse ascending". Falls back to
/// juz 1, which is unreachable for valid input.
pub fn juz_of(surah_number: u16, verse: u16) -> u8 {
    for juz in (0..JUZ_STARTS.len()).rev() {
        let (start_surah, start_verse) = JUZ_STARTS[juz];
        if surah_number > start_surah || (surah_number == start_surah && verse >= start_verse) {
            return juz as u8 + 1;
        }
    }
    1
}

/// The last verse of `juz` that falls inside `surah`. When the juz's end
/// lies in a later surah, the whole remainder of this surah belongs to it.
fn juz_end_in_surah(juz: u8, surah: &Surah) -> u16 {
    if (juz as usize) < JUZ_STARTS.len() {
        let (next_surah, next_verse) = JUZ_STARTS[juz as usize];
        if next_surah == surah.number {
            return next_verse - 1;
        }
    }
    // Either the next juz starts in a later surah, or this is juz 30,
    // which ends at the final verse of the final surah.
    surah.verse_count
}

/// Splits a validated range of one surah into per-juz sub-ranges.
///
/// Returns `(juz, sub-range)` pairs in ascending juz order; the sub-ranges
/// concatenate back to exactly the input range.
pub fn split_by_juz(surah_number: u16, range: VerseRange) -> Result<Vec<(u8, VerseRange)>, DomainError> {
    let surah = Surah::get(surah_number)?;
    let first = juz_of(surah_number, range.from_verse);
    let last = juz_of(surah_number, range.to_verse);

    let mut parts = Vec::with_capacity((last - first + 1) as usize);
    for juz in first..=last {
        let (start_surah, start_verse) = JUZ_STARTS[juz as usize - 1];
        let lo = if start_surah == surah_number {
            start_verse.max(range.from_verse)
        } else {
            range.from_verse
        };
        let hi = juz_end_in_surah(juz, surah).min(range.to_verse);
        if lo <= hi {
            parts.push((juz, VerseRange::raw(lo, hi)));
        }
    }
    Ok(parts)
}

/// The per-surah segments a whole juz is made of, in surah order.
///
/// Surahs contributing zero verses to the juz (a following juz starting at
/// verse 1 of its surah) are skipped.
pub fn juz_segments(juz: u8) -> Result<Vec<(u16, VerseRange)>, DomainError> {
    if !(1..=30).contains(&juz) {
        return Err(DomainError::InvalidJuz(juz.into()));
    }
    let (start_surah, start_verse) = JUZ_STARTS[juz as usize - 1];
    // Sentinel one surah past the end so juz 30 runs to (114, final verse).
    let (next_surah, next_verse) = if (juz as usize) < JUZ_STARTS.len() {
        JUZ_STARTS[juz as usize]
    } else {
        (115, 1)
    };

    let mut segments = Vec::new();
    for number in start_surah..=next_surah.min(114) {
        let surah = Surah::get(number)?;
        let from = if number == start_surah { start_verse } else { 1 };
        let to = if number == next_surah {
            next_verse - 1
        } else {
            surah.verse_count
        };
        if from <= to {
            segments.push((number, VerseRange::raw(from, to)));
        }
    }
    Ok(segments)
}

const fn s(
    number: u16,
    name: &'static str,
    meaning: &'static str,
    verse_count: u16,
    revelation: Revelation,
) -> Surah {
    Surah {
        number,
        name,
        meaning,
        verse_count,
        revelation,
    }
}

use Revelation::{Meccan, Medinan};

/// The 114 surahs, indexed by `number - 1`. Loaded once, never mutated.
pub const SURAHS: [Surah; 114] = [
    s(1, "Al-Fatihah", "The Opening", 7, Meccan),
    s(2, "Al-Baqarah", "The Cow", 286, Medinan),
    s(3, "Al-Imran", "The Family of Imran", 200, Medinan),
    s(4, "An-Nisa", "The Women", 176, Medinan),
    s(5, "Al-Ma'idah", "The Table Spread", 120, Medinan),
    s(6, "Al-An'am", "The Cattle", 165, Meccan),
    s(7, "Al-A'raf", "The Heights", 206, Meccan),
    s(8, "Al-Anfal", "The Spoils of War", 75, Medinan),
    s(9, "At-Tawbah", "The Repentance", 129, Medinan),
    s(10, "Yunus", "Jonah", 109, Meccan),
    s(11, "Hud", "Hud", 123, Meccan),
    s(12, "Yusuf", "Joseph", 111, Meccan),
    s(13, "Ar-Ra'd", "The Thunder", 43, Medinan),
    s(14, "Ibrahim", "Abraham", 52, Meccan),
    s(15, "Al-Hijr", "The Rocky Tract", 99, Meccan),
    s(16, "An-Nahl", "The Bee", 128, Meccan),
    s(17, "Al-Isra", "The Night Journey", 111, Meccan),
    s(18, "Al-Kahf", "The Cave", 110, Meccan),
    s(19, "Maryam", "Mary", 98, Meccan),
    s(20, "Taha", "Ta-Ha", 135, Meccan),
    s(21, "Al-Anbiya", "The Prophets", 112, Meccan),
    s(22, "Al-Hajj", "The Pilgrimage", 78, Medinan),
    s(23, "Al-Mu'minun", "The Believers", 118, Meccan),
    s(24, "An-Nur", "The Light", 64, Medinan),
    s(25, "Al-Furqan", "The Criterion", 77, Meccan),
    s(26, "Ash-Shu'ara", "The Poets", 227, Meccan),
    s(27, "An-Naml", "The Ant", 93, Meccan),
    s(28, "Al-Qasas", "The Stories", 88, Meccan),
    s(29, "Al-Ankabut", "The Spider", 69, Meccan),
    s(30, "Ar-Rum", "The Romans", 60, Meccan),
    s(31, "Luqman", "Luqman", 34, Meccan),
    s(32, "As-Sajdah", "The Prostration", 30, Meccan),
    s(33, "Al-Ahzab", "The Combined Forces", 73, Medinan),
    s(34, "Saba", "Sheba", 54, Meccan),
    s(35, "Fatir", "The Originator", 45, Meccan),
    s(36, "Ya-Sin", "Ya Sin", 83, Meccan),
    s(37, "As-Saffat", "Those Ranged in Ranks", 182, Meccan),
    s(38, "Sad", "The Letter Sad", 88, Meccan),
    s(39, "Az-Zumar", "The Troops", 75, Meccan),
    s(40, "Ghafir", "The Forgiver", 85, Meccan),
    s(41, "Fussilat", "Explained in Detail", 54, Meccan),
    s(42, "Ash-Shura", "The Consultation", 53, Meccan),
    s(43, "Az-Zukhruf", "The Ornaments of Gold", 89, Meccan),
    s(44, "Ad-Dukhan", "The Smoke", 59, Meccan),
    s(45, "Al-Jathiyah", "The Crouching", 37, Meccan),
    s(46, "Al-Ahqaf", "The Wind-Curved Sandhills", 35, Meccan),
    s(47, "Muhammad", "Muhammad", 38, Medinan),
    s(48, "Al-Fath", "The Victory", 29, Medinan),
    s(49, "Al-Hujurat", "The Rooms", 18, Medinan),
    s(50, "Qaf", "The Letter Qaf", 45, Meccan),
    s(51, "Adh-Dhariyat", "The Winnowing Winds", 60, Meccan),
    s(52, "At-Tur", "The Mount", 49, Meccan),
    s(53, "An-Najm", "The Star", 62, Meccan),
    s(54, "Al-Qamar", "The Moon", 55, Meccan),
    s(55, "Ar-Rahman", "The Beneficent", 78, Medinan),
    s(56, "Al-Waqi'ah", "The Inevitable", 96, Meccan),
    s(57, "Al-Hadid", "The Iron", 29, Medinan),
    s(58, "Al-Mujadila", "The Pleading Woman", 22, Medinan),
    s(59, "Al-Hashr", "The Exile", 24, Medinan),
    s(60, "Al-Mumtahanah", "She Who Is Examined", 13, Medinan),
    s(61, "As-Saff", "The Ranks", 14, Medinan),
    s(62, "Al-Jumu'ah", "The Congregation", 11, Medinan),
    s(63, "Al-Munafiqun", "The Hypocrites", 11, Medinan),
    s(64, "At-Taghabun", "The Mutual Disillusion", 18, Medinan),
    s(65, "At-Talaq", "The Divorce", 12, Medinan),
    s(66, "At-Tahrim", "The Prohibition", 12, Medinan),
    s(67, "Al-Mulk", "The Sovereignty", 30, Meccan),
    s(68, "Al-Qalam", "The Pen", 52, Meccan),
    s(69, "Al-Haqqah", "The Reality", 52, Meccan),
    s(70, "Al-Ma'arij", "The Ascending Stairways", 44, Meccan),
    s(71, "Nuh", "Noah", 28, Meccan),
    s(72, "Al-Jinn", "The Jinn", 28, Meccan),
    s(73, "Al-Muzzammil", "The Enshrouded One", 20, Meccan),
    s(74, "Al-Muddaththir", "The Cloaked One", 56, Meccan),
    s(75, "Al-Qiyamah", "The Resurrection", 40, Meccan),
    s(76, "Al-Insan", "The Man", 31, Medinan),
    s(77, "Al-Mursalat", "The Emissaries", 50, Meccan),
    s(78, "An-Naba", "The Tidings", 40, Meccan),
    s(79, "An-Nazi'at", "Those Who Drag Forth", 46, Meccan),
    s(80, "Abasa", "He Frowned", 42, Meccan),
    s(81, "At-Takwir", "The Overthrowing", 29, Meccan),
    s(82, "Al-Infitar", "The Cleaving", 19, Meccan),
    s(83, "Al-Mutaffifin", "The Defrauding", 36, Meccan),
    s(84, "Al-Inshiqaq", "The Sundering", 25, Meccan),
    s(85, "Al-Buruj", "The Mansions of the Stars", 22, Meccan),
    s(86, "At-Tariq", "The Nightcomer", 17, Meccan),
    s(87, "Al-A'la", "The Most High", 19, Meccan),
    s(88, "Al-Ghashiyah", "The Overwhelming", 26, Meccan),
    s(89, "Al-Fajr", "The Dawn", 30, Meccan),
    s(90, "Al-Balad", "The City", 20, Meccan),
    s(91, "Ash-Shams", "The Sun", 15, Meccan),
    s(92, "Al-Layl", "The Night", 21, Meccan),
    s(93, "Ad-Duha", "The Morning Hours", 11, Meccan),
    s(94, "Ash-Sharh", "The Relief", 8, Meccan),
    s(95, "At-Tin", "The Fig", 8, Meccan),
    s(96, "Al-Alaq", "The Clot", 19, Meccan),
    s(97, "Al-Qadr", "The Power", 5, Meccan),
    s(98, "Al-Bayyinah", "The Clear Proof", 8, Medinan),
    s(99, "Az-Zalzalah", "The Earthquake", 8, Medinan),
    s(100, "Al-Adiyat", "The Courser", 11, Meccan),
    s(101, "Al-Qari'ah", "The Calamity", 11, Meccan),
    s(102, "At-Takathur", "The Rivalry in Increase", 8, Meccan),
    s(103, "Al-Asr", "The Declining Day", 3, Meccan),
    s(104, "Al-Humazah", "The Traducer", 9, Meccan),
    s(105, "Al-Fil", "The Elephant", 5, Meccan),
    s(106, "Quraysh", "Quraysh", 4, Meccan),
    s(107, "Al-Ma'un", "The Small Kindnesses", 7, Meccan),
    s(108, "Al-Kawthar", "The Abundance", 3, Meccan),
    s(109, "Al-Kafirun", "The Disbelievers", 6, Meccan),
    s(110, "An-Nasr", "The Divine Support", 3, Medinan),
    s(111, "Al-Masad", "The Palm Fiber", 5, Meccan),
    s(112, "Al-Ikhlas", "The Sincerity", 4, Meccan),
    s(113, "Al-Falaq", "The Daybreak", 5, Meccan),
    s(114, "An-Nas", "Mankind", 6, Meccan),
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn juz_lookup_at_boundaries() {
        assert_eq!(juz_of(1, 1), 1);
        assert_eq!(juz_of(2, 141), 1);
        assert_eq!(juz_of(2, 142), 2);
        assert_eq!(juz_of(2, 252), 2);
        assert_eq!(juz_of(2, 253), 3);
        assert_eq!(juz_of(11, 5), 11);
        assert_eq!(juz_of(11, 6), 12);
        assert_eq!(juz_of(78, 1), 30);
        assert_eq!(juz_of(114, 6), 30);
    }

    #[test]
    fn range_validation() {
        let baqarah = Surah::get(2).unwrap();
        assert!(VerseRange::new(baqarah, 1, 286).is_ok());
        assert!(matches!(
            VerseRange::new(baqarah, 0, 5),
            Err(DomainError::InvalidVerseRange { .. })
        ));
        assert!(matches!(
            VerseRange::new(baqarah, 1, 287),
            Err(DomainError::InvalidVerseRange { .. })
        ));
        assert!(matches!(
            VerseRange::new(baqarah, 10, 9),
            Err(DomainError::InvalidVerseRange { .. })
        ));
        assert!(matches!(Surah::get(115), Err(DomainError::InvalidSurah(115))));
    }

    #[test]
    fn merge_is_commutative_and_idempotent() {
        let a = VerseRange::raw(3, 10);
        let b = VerseRange::raw(8, 20);
        assert_eq!(a.merge(b), b.merge(a));
        assert_eq!(a.merge(a), a);
        // Disjoint ranges are bridged into one envelope.
        let c = VerseRange::raw(40, 50);
        assert_eq!(a.merge(c), VerseRange::raw(3, 50));
    }

    #[test]
    fn split_within_a_single_juz() {
        let parts = split_by_juz(2, VerseRange::raw(1, 5)).unwrap();
        assert_eq!(parts, vec![(1, VerseRange::raw(1, 5))]);
    }

    #[test]
    fn split_across_three_ajza() {
        let parts = split_by_juz(2, VerseRange::raw(100, 260)).unwrap();
        assert_eq!(
            parts,
            vec![
                (1, VerseRange::raw(100, 141)),
                (2, VerseRange::raw(142, 252)),
                (3, VerseRange::raw(253, 260)),
            ]
        );
    }

    #[test]
    fn split_reconstructs_the_original_range() {
        // For a sample of ranges, the split covers [p1..p2] contiguously
        // and the pieces concatenate back to the input.
        let samples = [
            (2u16, 1u16, 286u16),
            (4, 20, 176),
            (9, 90, 129),
            (18, 1, 110),
            (114, 1, 6),
        ];
        for (surah_number, from, to) in samples {
            let surah = Surah::get(surah_number).unwrap();
            let range = VerseRange::new(surah, from, to).unwrap();
            let parts = split_by_juz(surah_number, range).unwrap();

            let p1 = juz_of(surah_number, from);
            let p2 = juz_of(surah_number, to);
            assert!(p1 <= p2);
            let juzes: Vec<u8> = parts.iter().map(|(j, _)| *j).collect();
            assert_eq!(juzes, (p1..=p2).collect::<Vec<_>>());

            assert_eq!(parts.first().unwrap().1.from_verse, from);
            assert_eq!(parts.last().unwrap().1.to_verse, to);
            for pair in parts.windows(2) {
                assert_eq!(pair[1].1.from_verse, pair[0].1.to_verse + 1);
            }
        }
    }

    #[test]
    fn whole_juz_segments() {
        let first = juz_segments(1).unwrap();
        assert_eq!(
            first,
            vec![(1, VerseRange::raw(1, 7)), (2, VerseRange::raw(1, 141))]
        );

        // Juz 30 runs to the final verse of An-Nas.
        let last = juz_segments(30).unwrap();
        assert_eq!(last.first().unwrap(), &(78, VerseRange::raw(1, 40)));
        assert_eq!(last.last().unwrap(), &(114, VerseRange::raw(1, 6)));

        assert!(matches!(juz_segments(0), Err(DomainError::InvalidJuz(0))));
        assert!(matches!(juz_segments(31), Err(DomainError::InvalidJuz(31))));
    }

    #[test]
    fn segments_skip_surahs_with_no_verses_in_the_juz() {
        // Juz 14 starts at Al-Hijr 1; juz 15 starts at Al-Isra 1, so
        // Al-Isra contributes nothing to juz 14.
        let parts = juz_segments(14).unwrap();
        assert_eq!(
            parts,
            vec![(15, VerseRange::raw(1, 99)), (16, VerseRange::raw(1, 128))]
        );
    }
}
