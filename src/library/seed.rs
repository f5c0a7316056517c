use super::model::{Library, Playlist, Track};

const SEED: &[(&str, &[(&str, &str, u32)])] = &[
    (
        "Garage Gold",
        &[
            ("Tape Deck Hero", "The Sandwaves", 181),
            ("Neon Arcade", "Cassette Bloom", 204),
            ("Skatepark Sunset", "Glass Signals", 193),
        ],
    ),
    (
        "Pixel Nights",
        &[
            ("8-Bit Boulevard", "Data Hearts", 166),
            ("Save Point", "Coin Loop", 176),
            ("CRT Dreams", "Moon Sprite", 212),
        ],
    ),
    (
        "Roadtrip Mix",
        &[
            ("Exit 95", "Open Highway", 228),
            ("Diner Coffee", "June & The Miles", 189),
            ("Midnight Polaroid", "Motel Stereo", 201),
        ],
    ),
];

/// The library a fresh install starts with: three playlists of synth tracks.
pub fn seeded_library() -> Library {
    Library::new(
        SEED.iter()
            .map(|(name, tracks)| Playlist {
                name: (*name).to_string(),
                tracks: tracks
                    .iter()
                    .map(|(title, artist, secs)| Track::synth(*title, *artist, *secs))
                    .collect(),
            })
            .collect(),
    )
}
