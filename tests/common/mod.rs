//! Shared test documents.
#![allow(dead_code)]
use rexfilter::pipelines::types::DocumentRecord;

pub const SENTENCES: [&str; 12] = [
    "Die Gemeinde hat am Montag beschlossen, dass die neue Brücke über den Fluss noch in diesem Jahr gebaut wird.",
    "Die Kosten werden von der Stadt und dem Land gemeinsam getragen, wie der Sprecher der Verwaltung mitteilte.",
    "Der Bürgermeister ist mit dem Ergebnis sehr zufrieden und hofft auf einen schnellen Baubeginn im Frühjahr.",
    "Viele Bürger sind aber nicht von dem Projekt überzeugt, weil sie mehr Verkehr in der Innenstadt befürchten.",
    "Eine Initiative hat deshalb schon im vergangenen Jahr mehr als tausend Unterschriften gegen den Bau gesammelt.",
    "Die Planer halten dagegen, dass die alte Brücke seit langem marode ist und dringend ersetzt werden muss.",
    "Nach ihren Berechnungen wird sich der Verkehr durch die neue Verbindung sogar besser auf die Stadtteile verteilen.",
    "Auch für Radfahrer und Fußgänger soll es auf der Brücke breite und sichere Wege geben.",
    "Die Bauzeit wird auf etwa zwei Jahre geschätzt, in denen es immer wieder zu Sperrungen kommen kann.",
    "Der Gemeinderat will die Anwohner deshalb regelmäßig über den Stand der Arbeiten informieren.",
    "Eine erste Versammlung ist für den kommenden Monat im großen Saal des Rathauses geplant.",
    "Dort sollen auch die Vertreter der Initiative ihre Einwände noch einmal vortragen können.",
];

pub const FRENCH: &str = "Le conseil municipal a décidé lundi que le nouveau pont sur la rivière sera construit cette année. \
    Les coûts seront partagés entre la ville et la région, comme l'a indiqué le porte-parole de la mairie. \
    Le maire est très satisfait du résultat et espère un début rapide des travaux au printemps. \
    Beaucoup d'habitants ne sont pas convaincus par le projet, car ils craignent plus de circulation dans le centre.";

pub const LIBRARY: &str = "Die Stadtbibliothek wird ab dem nächsten Monat auch am Samstag geöffnet sein. \
    Damit reagiert die Leitung auf den Wunsch vieler Familien, die unter der Woche keine Zeit für einen Besuch haben. \
    Zusätzlich sollen mehr Bücher für Kinder und Jugendliche angeschafft werden, wofür der Rat eine Spende erhalten hat. \
    Die Mitarbeiterinnen freuen sich über das Interesse und bieten wieder regelmäßige Lesungen an.";

/// Three paragraphs of four sentences.
pub fn article() -> String {
    SENTENCES
        .chunks(4)
        .map(|paragraph| paragraph.join(" "))
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// The article with `nb_changes` words replaced, spread over the text.
pub fn variant(nb_changes: usize) -> String {
    let replacements = [
        ("Montag", "Dienstag"),
        ("Frühjahr", "Sommer"),
        ("tausend", "zweitausend"),
        ("Radfahrer", "Kinder"),
        ("Monat", "Herbst"),
    ];
    replacements
        .iter()
        .take(nb_changes)
        .fold(article(), |text, (from, to)| text.replacen(from, to, 1))
}

pub fn record(id: &str, text: &str) -> DocumentRecord {
    DocumentRecord::from_text(id, text)
}
