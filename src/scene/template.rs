//! Offline story generation from fixed themes and characters.
//!
//! Output uses the same `[SCENE: ...]` script format the parser reads.

use crate::error::Result;
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum Theme {
    Friendship,
    Courage,
    Kindness,
    Perseverance,
    #[value(name = "being_different")]
    BeingDifferent,
    #[value(name = "overcoming_fear")]
    OvercomingFear,
}

impl Theme {
    pub const ALL: [Theme; 6] = [
        Theme::Friendship,
        Theme::Courage,
        Theme::Kindness,
        Theme::Perseverance,
        Theme::BeingDifferent,
        Theme::OvercomingFear,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Theme::Friendship => "friendship",
            Theme::Courage => "courage",
            Theme::Kindness => "kindness",
            Theme::Perseverance => "perseverance",
            Theme::BeingDifferent => "being_different",
            Theme::OvercomingFear => "overcoming_fear",
        }
    }

    /// "being_different" -> "Being Different"
    pub fn display_title(self) -> String {
        self.key()
            .split('_')
            .map(capitalize)
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn moral(self) -> &'static str {
        match self {
            Theme::Friendship => "True friends accept you for who you are",
            Theme::Courage => "Being brave means doing what's right even when you're scared",
            Theme::Kindness => "Small acts of kindness make the world brighter",
            Theme::Perseverance => "Never give up, and you can achieve anything",
            Theme::BeingDifferent => "What makes you different makes you special",
            Theme::OvercomingFear => "Facing our fears helps us grow stronger",
        }
    }

    pub fn emotions(self) -> [&'static str; 4] {
        match self {
            Theme::Friendship => ["lonely", "hopeful", "happy", "grateful"],
            Theme::Courage => ["scared", "determined", "proud", "confident"],
            Theme::Kindness => ["caring", "helpful", "joyful", "loved"],
            Theme::Perseverance => ["frustrated", "determined", "trying", "successful"],
            Theme::BeingDifferent => ["sad", "confused", "accepting", "proud"],
            Theme::OvercomingFear => ["afraid", "nervous", "brave", "triumphant"],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Character {
    pub kind: &'static str,
    pub name: &'static str,
    pub setting: &'static str,
}

const fn character(kind: &'static str, name: &'static str, setting: &'static str) -> Character {
    Character { kind, name, setting }
}

pub const CHARACTERS: [Character; 12] = [
    character("star", "Twinkle", "night sky"),
    character("rabbit", "Rosie", "meadow"),
    character("penguin", "Penny", "snowy Antarctica"),
    character("owl", "Oliver", "forest"),
    character("turtle", "Tilly", "pond"),
    character("zebra", "Ziggy", "African savanna"),
    character("butterfly", "Bella", "flower garden"),
    character("bear", "Bruno", "cozy cave"),
    character("dolphin", "Danny", "ocean"),
    character("fox", "Finn", "autumn forest"),
    character("kitten", "Katie", "warm house"),
    character("elephant", "Ellie", "jungle"),
];

/// First character whose type contains `query`, ignoring case.
pub fn find_character(query: &str) -> Option<Character> {
    let query = query.to_lowercase();
    CHARACTERS
        .iter()
        .copied()
        .find(|c| c.kind.to_lowercase().contains(&query))
}

struct StoryElements {
    problem: String,
    discovery: String,
    greeting: &'static str,
    advice: &'static str,
    first_attempt: String,
    challenge: &'static str,
    progress: String,
    success: String,
    celebration: &'static str,
    encouragement: &'static str,
}

fn story_elements<R: Rng + ?Sized>(
    theme: Theme,
    name: &str,
    setting: &str,
    rng: &mut R,
) -> StoryElements {
    match theme {
        Theme::Friendship => {
            let visitor = ["butterfly", "bird", "creature"]
                .choose(rng)
                .copied()
                .unwrap_or("creature");
            StoryElements {
                problem: format!("{name} didn't have any friends to play with"),
                discovery: format!("A new {visitor} had arrived in the {setting}!"),
                greeting: "Hello there! You look like you could use a friend",
                advice: "Making friends is easy - just be yourself and show kindness",
                first_attempt: format!("{name} took a deep breath and said hello to someone new."),
                challenge: "The other animals seemed busy with their own games.",
                progress: format!("One by one, others started smiling at {name}."),
                success: format!("{name} had made not one, but many new friends!"),
                celebration: "laughing and playing together",
                encouragement: "Don't be shy - everyone needs a friend like you",
            }
        }
        Theme::Courage => StoryElements {
            problem: format!("{name} was afraid of trying new things"),
            discovery: "Someone needed help, but it meant facing a scary challenge!".to_string(),
            greeting: "You look worried. What's troubling you, little one",
            advice: "Being brave doesn't mean not being scared. It means trying anyway",
            first_attempt: format!("Though trembling a little, {name} took the first step."),
            challenge: "The path seemed long and the goal seemed far away.",
            progress: format!("With each step, {name} felt a little braver."),
            success: format!("{name} conquered the fear and helped save the day!"),
            celebration: "jumping up and down with joy",
            encouragement: "You're braver than you know. Just take one small step",
        },
        Theme::Kindness => StoryElements {
            problem: format!("{name} saw others being unkind and felt sad"),
            discovery: "A small creature was crying and needed help.".to_string(),
            greeting: "That was very kind of you to stop and care",
            advice: "Kindness is like magic - the more you give, the more comes back",
            first_attempt: format!("{name} shared some food with the hungry little one."),
            challenge: "Some others laughed and said it was a waste of time.",
            progress: format!(
                "But the little creature's smile made {name} feel warm inside."
            ),
            success: format!("Soon, everyone wanted to be kind too, inspired by {name}!"),
            celebration: "sharing treats and making everyone smile",
            encouragement: "A small kindness can brighten someone's whole day",
        },
        Theme::Perseverance => StoryElements {
            problem: format!("{name} couldn't do something that everyone else could do"),
            discovery: "There was a chance to try again, but it seemed impossible.".to_string(),
            greeting: "I see you've been practicing. That takes real dedication",
            advice: "Every expert was once a beginner. Just keep trying",
            first_attempt: format!("{name} tried again, focusing on just one small part."),
            challenge: "The first few tries didn't work, and it felt frustrating.",
            progress: format!("But slowly, {name} started to get the hang of it."),
            success: format!("{name} finally succeeded after many patient tries!"),
            celebration: "doing a happy dance together",
            encouragement: "Don't give up! Each try makes you a little bit better",
        },
        Theme::BeingDifferent => StoryElements {
            problem: format!("{name} looked a little different from the others"),
            discovery: "The differences that seemed strange were actually quite special."
                .to_string(),
            greeting: "Wow, I've never seen anyone quite like you before - how wonderful",
            advice: "What makes you different is what makes you uniquely you",
            first_attempt: format!("{name} decided to stop hiding and show the real self."),
            challenge: "Some still stared and whispered at first.",
            progress: format!("But others started to admire what made {name} special."),
            success: format!("{name}'s unique quality turned out to be a wonderful gift!"),
            celebration: "admiring each other's unique features",
            encouragement: "Never hide who you are. Your differences are your superpowers",
        },
        Theme::OvercomingFear => StoryElements {
            problem: format!("{name} was very afraid of the dark"),
            discovery: "Something beautiful could only be seen at night!".to_string(),
            greeting: "I used to be scared too. Would you like some company",
            advice: "The dark is just the light taking a rest. There's nothing to fear",
            first_attempt: format!("{name} peeked out into the darkness for just a moment."),
            challenge: "Strange sounds made the fear come rushing back.",
            progress: format!("But slowly, {name}'s eyes adjusted and saw beautiful things."),
            success: format!("The night was full of wonders {name} had never seen before!"),
            celebration: "watching the stars twinkle together",
            encouragement: "What seems scary often hides something beautiful",
        },
    }
}

/// Fills the twelve-scene template. Unset theme/character are picked at random.
pub fn generate_story<R: Rng + ?Sized>(
    rng: &mut R,
    theme: Option<Theme>,
    hero: Option<Character>,
) -> String {
    let theme = theme.unwrap_or_else(|| *Theme::ALL.choose(rng).unwrap_or(&Theme::Friendship));
    let hero = hero.unwrap_or_else(|| *CHARACTERS.choose(rng).unwrap_or(&CHARACTERS[0]));

    let helpers: Vec<_> = CHARACTERS.iter().filter(|c| c.kind != hero.kind).collect();
    let helper = helpers.choose(rng).copied().copied().unwrap_or(CHARACTERS[3]);

    let name = hero.name;
    let kind = hero.kind;
    let setting = hero.setting;
    let helper_name = helper.name;
    let helper_type = helper.kind;
    let [emotion1, emotion2, emotion3, emotion4] = theme.emotions();
    let moral = theme.moral();
    let e = story_elements(theme, name, setting, rng);
    let title = format!(
        "{} the {} Learns About {}",
        name,
        capitalize(kind),
        theme.display_title()
    );

    format!(
        r#"Title: {title}

[SCENE: {setting} with {name} the {kind} looking {emotion1}]
In the {setting}, there lived a little {kind} named {name}. {name} was feeling {emotion1} because {problem}.

[SCENE: {name} looking around, noticing something that catches their attention]
One day, {name} noticed something unusual. {discovery}

[SCENE: {name} meeting {helper_name} the {helper_type}, who looks friendly]
That's when {name} met {helper_name} the {helper_type}. "{greeting}" said {helper_name} with a warm smile.

[SCENE: {name} and {helper_name} talking, {name} looking {emotion2}]
{name} explained the problem. {helper_name} listened carefully and said, "{advice}"

[SCENE: {name} trying something new, looking {emotion3}]
With {helper_name}'s encouragement, {name} decided to try. {first_attempt}

[SCENE: {name} facing a small challenge, but not giving up]
It wasn't easy at first. {challenge} But {name} remembered {helper_name}'s words and kept going.

[SCENE: {name} starting to succeed, a smile forming on their face]
Slowly, something wonderful began to happen. {progress}

[SCENE: {name} achieving the goal, looking {emotion4} and proud]
Finally, {name} did it! {success} {name} felt so {emotion4}!

[SCENE: {name} and {helper_name} celebrating together]
{helper_name} cheered, "I knew you could do it, {name}!" They celebrated together, {celebration}.

[SCENE: {name} helping another little {kind} who has the same problem]
Later, {name} saw another little one with the same problem. Now it was {name}'s turn to help!

[SCENE: {name} sharing wisdom, looking kind and wise]
"{encouragement}" {name} said gently, just like {helper_name} had done.

[SCENE: {setting} at sunset, {name} happy and content with new friends around]
The end. Remember, {moral}
"#,
        problem = e.problem,
        discovery = e.discovery,
        greeting = e.greeting,
        advice = e.advice,
        first_attempt = e.first_attempt,
        challenge = e.challenge,
        progress = e.progress,
        success = e.success,
        celebration = e.celebration,
        encouragement = e.encouragement,
    )
}

/// File-name slug of a story's title: lowercase alphanumerics, `_` for spaces.
pub fn story_slug(story: &str) -> String {
    let title = story
        .lines()
        .next()
        .unwrap_or_default()
        .replace("Title:", "");
    let slug: String = title
        .trim()
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric() || *c == ' ')
        .map(|c| if c == ' ' { '_' } else { c })
        .take(50)
        .collect();
    if slug.is_empty() {
        "story".to_string()
    } else {
        slug
    }
}

pub async fn save_story(story: &str, filename: Option<&str>, dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir).await?;
    let filename = match filename {
        Some(name) => name.to_string(),
        None => format!("{}.txt", story_slug(story)),
    };
    let path = dir.join(filename);
    tokio::fs::write(&path, story).await?;
    Ok(path)
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}
