//! Knowledge Base - built-in categories, trigger patterns and canned replies
//!
//! Every category owns an ordered pattern list and an ordered response list.
//! Entry order matters: the pattern matcher breaks length ties by the order
//! entries and patterns appear here.

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Countries with a dedicated capital-city reply
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Country {
    Canada,
    France,
    Germany,
    Japan,
    Nigeria,
    UnitedKingdom,
    UnitedStates,
    Australia,
    India,
}

impl Country {
    pub fn as_str(&self) -> &'static str {
        match self {
            Country::Canada => "canada",
            Country::France => "france",
            Country::Germany => "germany",
            Country::Japan => "japan",
            Country::Nigeria => "nigeria",
            Country::UnitedKingdom => "united_kingdom",
            Country::UnitedStates => "united_states",
            Country::Australia => "australia",
            Country::India => "india",
        }
    }
}

/// Closed set of reply categories
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Greeting,
    HowAreYou,
    Identity,
    Geography,
    Capital(Country),
    Capitals,
    Joke,
    Fact,
    Explain,
    Time,
    Date,
    Math,
    Thanks,
    Goodbye,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Greeting => "greeting",
            Category::HowAreYou => "how_are_you",
            Category::Identity => "who_are_you",
            Category::Geography => "geography",
            Category::Capital(_) => "capital",
            Category::Capitals => "capitals",
            Category::Joke => "joke",
            Category::Fact => "fact",
            Category::Explain => "explain",
            Category::Time => "time",
            Category::Date => "date",
            Category::Math => "math",
            Category::Thanks => "thanks",
            Category::Goodbye => "goodbye",
        }
    }
}

/// A candidate reply; time and date are filled in when the reply is sent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResponseTemplate {
    Text(String),
    CurrentTime,
    CurrentDate,
}

impl ResponseTemplate {
    pub fn text(s: &str) -> Self {
        ResponseTemplate::Text(s.to_string())
    }

    /// Whether the rendered text depends on the wall clock
    pub fn is_dynamic(&self) -> bool {
        !matches!(self, ResponseTemplate::Text(_))
    }

    pub fn render(&self, now: &DateTime<FixedOffset>) -> String {
        match self {
            ResponseTemplate::Text(text) => text.clone(),
            ResponseTemplate::CurrentTime => {
                format!("⏰ The current time is: {}", now.format("%I:%M %p"))
            }
            ResponseTemplate::CurrentDate => {
                format!("📅 Today is: {}", now.format("%B %d, %Y (%A)"))
            }
        }
    }
}

/// One category with its triggers and replies
#[derive(Debug, Clone)]
pub struct KnowledgeEntry {
    pub category: Category,
    pub patterns: Vec<String>,
    pub responses: Vec<ResponseTemplate>,
}

impl KnowledgeEntry {
    fn new(category: Category, patterns: &[&str], responses: Vec<ResponseTemplate>) -> Self {
        Self {
            category,
            patterns: patterns.iter().map(|p| p.to_lowercase()).collect(),
            responses,
        }
    }

    fn texts(category: Category, patterns: &[&str], responses: &[&str]) -> Self {
        Self::new(
            category,
            patterns,
            responses.iter().map(|r| ResponseTemplate::text(r)).collect(),
        )
    }
}

/// Immutable, shared set of knowledge entries
#[derive(Debug, Clone)]
pub struct KnowledgeBase {
    entries: Vec<KnowledgeEntry>,
}

impl KnowledgeBase {
    /// Build from explicit entries; entries with no patterns or no
    /// responses can never produce a reply and are dropped.
    pub fn from_entries(entries: Vec<KnowledgeEntry>) -> Self {
        let entries = entries
            .into_iter()
            .filter(|e| !e.patterns.is_empty() && !e.responses.is_empty())
            .collect();
        Self { entries }
    }

    pub fn entries(&self) -> &[KnowledgeEntry] {
        &self.entries
    }

    pub fn entry(&self, category: Category) -> Option<&KnowledgeEntry> {
        self.entries.iter().find(|e| e.category == category)
    }

    pub fn responses(&self, category: Category) -> &[ResponseTemplate] {
        self.entry(category)
            .map(|e| e.responses.as_slice())
            .unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The built-in knowledge base
    pub fn builtin() -> Self {
        Self::from_entries(vec![
            KnowledgeEntry::texts(
                Category::Greeting,
                &[
                    "hello",
                    "hi",
                    "hey",
                    "good morning",
                    "good afternoon",
                    "good evening",
                    "howdy",
                    "sup",
                    "yo",
                ],
                &[
                    "👋 Hello! I'm your chat assistant. How can I help you today?",
                    "Hi there! 😊 What can I do for you?",
                    "Hey! Great to hear from you! What's on your mind?",
                    "Hello! 🌟 Ready to assist you. What do you need?",
                ],
            ),
            KnowledgeEntry::texts(
                Category::HowAreYou,
                &["how are you", "how are things", "how's it going", "how do you do"],
                &[
                    "I'm doing great, thanks for asking! 😊 How about you?",
                    "All systems running smoothly! 🚀 What can I help you with?",
                ],
            ),
            KnowledgeEntry::texts(
                Category::Identity,
                &["who are you", "what are you", "tell me about yourself", "your name"],
                &[
                    "I'm a chat assistant! 🤖 I can answer questions, tell jokes and facts, and do quick math. What would you like to know?",
                    "I'm your friendly assistant, built to answer quickly even without a language model behind me. How can I help? 😊",
                ],
            ),
            KnowledgeEntry::texts(
                Category::Geography,
                &[
                    "usa in africa",
                    "is usa in africa",
                    "where is usa",
                    "usa location",
                    "america continent",
                ],
                &[
                    "No, the USA is not in Africa! 🌍 The United States is in North America, while Africa is a separate continent on the other side of the Atlantic Ocean. Want to know more about geography?",
                ],
            ),
            KnowledgeEntry::texts(
                Category::Capital(Country::Canada),
                &["capital of canada", "canada's capital", "canadian capital"],
                &["🍁 The capital of Canada is Ottawa, located in the province of Ontario."],
            ),
            KnowledgeEntry::texts(
                Category::Capital(Country::France),
                &["capital of france", "france's capital", "french capital"],
                &["🇫🇷 The capital of France is Paris, home of the Eiffel Tower."],
            ),
            KnowledgeEntry::texts(
                Category::Capital(Country::Germany),
                &["capital of germany", "germany's capital", "german capital"],
                &["🇩🇪 The capital of Germany is Berlin."],
            ),
            KnowledgeEntry::texts(
                Category::Capital(Country::Japan),
                &["capital of japan", "japan's capital", "japanese capital"],
                &["🗾 The capital of Japan is Tokyo, one of the largest cities in the world."],
            ),
            KnowledgeEntry::texts(
                Category::Capital(Country::Nigeria),
                &["capital of nigeria", "nigeria's capital", "nigerian capital"],
                &["🇳🇬 The capital of Nigeria is Abuja. It replaced Lagos as the capital in 1991."],
            ),
            KnowledgeEntry::texts(
                Category::Capital(Country::UnitedKingdom),
                &["capital of the uk", "capital of uk", "capital of england", "british capital"],
                &["🇬🇧 The capital of the United Kingdom is London."],
            ),
            KnowledgeEntry::texts(
                Category::Capital(Country::UnitedStates),
                &[
                    "capital of the usa",
                    "capital of usa",
                    "capital of america",
                    "capital of the united states",
                ],
                &["🇺🇸 The capital of the United States is Washington, D.C."],
            ),
            KnowledgeEntry::texts(
                Category::Capital(Country::Australia),
                &["capital of australia", "australia's capital", "australian capital"],
                &["🦘 The capital of Australia is Canberra, not Sydney!"],
            ),
            KnowledgeEntry::texts(
                Category::Capital(Country::India),
                &["capital of india", "india's capital", "indian capital"],
                &["🇮🇳 The capital of India is New Delhi."],
            ),
            KnowledgeEntry::texts(
                Category::Capitals,
                &["capital of", "capital city", "capitals"],
                &[
                    "🏛️ I know many world capitals! For example: USA - Washington D.C., UK - London, France - Paris, Nigeria - Abuja. Which country's capital would you like to know?",
                ],
            ),
            KnowledgeEntry::texts(
                Category::Joke,
                &["joke", "jokes", "make me laugh", "funny", "humor"],
                &[
                    "😄 Here's a joke: Why don't scientists trust atoms? Because they make up everything!",
                    "🐻 Here's a joke: What do you call a bear with no teeth? A gummy bear!",
                    "🌾 Here's a joke: Why did the scarecrow win an award? He was outstanding in his field!",
                    "🍝 Here's a joke: What do you call a fake noodle? An impasta!",
                    "🥚 Here's a joke: Why don't eggs tell jokes? They'd crack each other up!",
                    "🌊 Here's a joke: What did the ocean say to the beach? Nothing, it just waved!",
                ],
            ),
            KnowledgeEntry::texts(
                Category::Fact,
                &["fact", "facts", "tell me something interesting", "did you know"],
                &[
                    "🧠 Fun fact: Honey never spoils! Archaeologists have found 3000-year-old honey in Egyptian tombs that's still edible!",
                    "🌊 Fun fact: The Atlantic Ocean is saltier than the Pacific Ocean!",
                    "🐙 Cool fact: Octopuses have three hearts and blue blood!",
                    "☀️ Amazing fact: It takes sunlight 8 minutes and 20 seconds to reach Earth!",
                    "🦒 Interesting fact: A giraffe's tongue is about 20 inches long!",
                ],
            ),
            KnowledgeEntry::texts(
                Category::Explain,
                &["explain", "what is", "define", "tell me about", "how does"],
                &[
                    "I'd be happy to explain! 📚 Could you be more specific about the topic? For example, ask 'What is a capital city?' or 'Tell me a fact'.",
                ],
            ),
            KnowledgeEntry::new(
                Category::Time,
                &["time", "what time", "current time", "the time", "time is it"],
                vec![ResponseTemplate::CurrentTime],
            ),
            KnowledgeEntry::new(
                Category::Date,
                &["date", "what date", "today", "day", "the date", "what day", "date today"],
                vec![ResponseTemplate::CurrentDate],
            ),
            KnowledgeEntry::texts(
                Category::Math,
                &["calculate", "math", "plus", "minus", "times", "divide", "+", "-", "*", "/"],
                &["🔢 I can help with math! Try asking me something like '2 + 2' or 'what is 15 times 3?'"],
            ),
            KnowledgeEntry::texts(
                Category::Thanks,
                &["thank", "thanks", "thx", "appreciate"],
                &[
                    "You're welcome! 😊 Happy to help!",
                    "No problem! That's what I'm here for! 🙌",
                    "Anytime! Feel free to ask more questions! 💪",
                ],
            ),
            KnowledgeEntry::texts(
                Category::Goodbye,
                &["bye", "goodbye", "see you", "later", "gotta go"],
                &[
                    "Goodbye! 👋 Have a great day!",
                    "See you later! Come back anytime! 😊",
                    "Take care! 🌟 Feel free to chat again soon!",
                ],
            ),
        ])
    }
}

/// Fallback replies when the message is a question nothing matched
pub const QUESTION_DEFAULTS: &[&str] = &[
    "That's an interesting question! 🤔 I don't have specific information about that right now, but I can help with general questions, jokes, facts, and math!",
    "Good question! 🧐 My knowledge is limited in that area. Try asking about capitals, the time or date, or ask me for a fact!",
];

/// Fallback replies for statements nothing matched; `{message}` is replaced
/// with the user's text
pub const GENERIC_DEFAULTS: &[&str] = &[
    "I understand! While my knowledge is limited in that area, try asking me for a joke, a fact, or some simple math! 📚",
    "You said: '{message}' - thanks for sharing! Try asking about time, date, jokes, or facts. I'm constantly learning! 🧠",
    "Got it! 👍 If you'd like, I can tell you a joke, share a fact, or solve a quick calculation.",
];
