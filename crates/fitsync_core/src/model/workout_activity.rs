//! Workout activity classification reported by the health platform.
//!
//! Raw codes follow the platform's workout activity type numbering so native
//! hosts can pass them through unchanged.

use serde::{Deserialize, Serialize};

macro_rules! workout_activities {
    ($($variant:ident = $code:literal => $display:literal,)+) => {
        /// Workout activity kind.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum WorkoutActivityType {
            $($variant,)+
            /// Code not known to this build.
            Unknown,
        }

        impl WorkoutActivityType {
            /// Maps a platform raw code; unrecognized codes become `Unknown`.
            pub fn from_raw(code: u32) -> Self {
                match code {
                    $($code => Self::$variant,)+
                    _ => Self::Unknown,
                }
            }

            /// Human-readable activity name.
            pub fn display_name(self) -> &'static str {
                match self {
                    $(Self::$variant => $display,)+
                    Self::Unknown => "Unknown",
                }
            }
        }
    };
}

workout_activities! {
    AmericanFootball = 1 => "American Football",
    Archery = 2 => "Archery",
    AustralianFootball = 3 => "Australian Football",
    Badminton = 4 => "Badminton",
    Baseball = 5 => "Baseball",
    Basketball = 6 => "Basketball",
    Bowling = 7 => "Bowling",
    Boxing = 8 => "Boxing",
    Climbing = 9 => "Climbing",
    Cricket = 10 => "Cricket",
    CrossTraining = 11 => "Cross Training",
    Curling = 12 => "Curling",
    Cycling = 13 => "Cycling",
    Dance = 14 => "Dance",
    DanceInspiredTraining = 15 => "Dance Inspired Training",
    Elliptical = 16 => "Elliptical",
    EquestrianSports = 17 => "Equestrian Sports",
    Fencing = 18 => "Fencing",
    Fishing = 19 => "Fishing",
    FunctionalStrengthTraining = 20 => "Functional Strength Training",
    Golf = 21 => "Golf",
    Gymnastics = 22 => "Gymnastics",
    Handball = 23 => "Handball",
    Hiking = 24 => "Hiking",
    Hockey = 25 => "Hockey",
    Hunting = 26 => "Hunting",
    Lacrosse = 27 => "Lacrosse",
    MartialArts = 28 => "Martial Arts",
    MindAndBody = 29 => "Mind And Body",
    MixedMetabolicCardioTraining = 30 => "Mixed Metabolic Cardio Training",
    PaddleSports = 31 => "Paddle Sports",
    Play = 32 => "Play",
    PreparationAndRecovery = 33 => "Preparation And Recovery",
    Racquetball = 34 => "Racquetball",
    Rowing = 35 => "Rowing",
    Rugby = 36 => "Rugby",
    Running = 37 => "Running",
    Sailing = 38 => "Sailing",
    SkatingSports = 39 => "Skating Sports",
    SnowSports = 40 => "Snow Sports",
    Soccer = 41 => "Soccer",
    Softball = 42 => "Softball",
    Squash = 43 => "Squash",
    StairClimbing = 44 => "Stair Climbing",
    SurfingSports = 45 => "Surfing Sports",
    Swimming = 46 => "Swimming",
    TableTennis = 47 => "Table Tennis",
    Tennis = 48 => "Tennis",
    TrackAndField = 49 => "Track And Field",
    TraditionalStrengthTraining = 50 => "Traditional Strength Training",
    Volleyball = 51 => "Volleyball",
    Walking = 52 => "Walking",
    WaterFitness = 53 => "Water Fitness",
    WaterPolo = 54 => "Water Polo",
    WaterSports = 55 => "Water Sports",
    Wrestling = 56 => "Wrestling",
    Yoga = 57 => "Yoga",
    Barre = 58 => "Barre",
    CoreTraining = 59 => "Core Training",
    CrossCountrySkiing = 60 => "Cross Country Skiing",
    DownhillSkiing = 61 => "Downhill Skiing",
    Flexibility = 62 => "Flexibility",
    HighIntensityIntervalTraining = 63 => "High Intensity Interval Training",
    JumpRope = 64 => "Jump Rope",
    Kickboxing = 65 => "Kickboxing",
    Pilates = 66 => "Pilates",
    Snowboarding = 67 => "Snowboarding",
    Stairs = 68 => "Stairs",
    StepTraining = 69 => "Step Training",
    WheelchairWalkPace = 70 => "Wheelchair Walk Pace",
    WheelchairRunPace = 71 => "Wheelchair Run Pace",
    TaiChi = 72 => "Tai Chi",
    MixedCardio = 73 => "Mixed Cardio",
    HandCycling = 74 => "Hand Cycling",
    DiscSports = 75 => "Disc Sports",
    FitnessGaming = 76 => "Fitness Gaming",
    CardioDance = 77 => "Cardio Dance",
    SocialDance = 78 => "Social Dance",
    Pickleball = 79 => "Pickleball",
    Cooldown = 80 => "Cooldown",
    SwimBikeRun = 82 => "Swim Bike Run",
    Transition = 83 => "Transition",
    UnderwaterDiving = 84 => "Underwater Diving",
    Other = 3000 => "Other",
}

impl WorkoutActivityType {
    /// Machine code: display name lower-cased, spaces replaced by `-`.
    pub fn code(self) -> String {
        self.display_name().to_lowercase().replace(' ', "-")
    }
}

#[cfg(test)]
mod tests {
    use super::WorkoutActivityType;

    #[test]
    fn maps_raw_codes_and_falls_back_to_unknown() {
        assert_eq!(
            WorkoutActivityType::from_raw(37),
            WorkoutActivityType::Running
        );
        assert_eq!(WorkoutActivityType::from_raw(3000), WorkoutActivityType::Other);
        assert_eq!(
            WorkoutActivityType::from_raw(81),
            WorkoutActivityType::Unknown
        );
        assert_eq!(WorkoutActivityType::Unknown.display_name(), "Unknown");
    }

    #[test]
    fn code_is_kebab_cased_display_name() {
        assert_eq!(
            WorkoutActivityType::TraditionalStrengthTraining.code(),
            "traditional-strength-training"
        );
        assert_eq!(WorkoutActivityType::Yoga.code(), "yoga");
    }
}
