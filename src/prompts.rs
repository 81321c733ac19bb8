//! Prompt templates sent to the language model.
//!
//! The sheets target French-language classrooms, so the generation prompts
//! are written in French. The page-lookup prompt stays in English: it asks
//! for numbers only and models follow it more reliably.

use serde::{Deserialize, Serialize};

/// Who the sheet is for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Audience {
    /// Lesson plan for the teacher ("fiche pédagogique")
    #[default]
    Teacher,
    /// Revision notes for the student ("fiche de révision")
    Student,
}

impl Audience {
    /// Title printed on every page of the rendered sheet
    pub fn page_title(&self) -> &'static str {
        match self {
            Self::Teacher => "Fiche Pédagogique",
            Self::Student => "Fiche de Révision",
        }
    }
}

/// Ask the model for the page range of `topic` in a table of contents.
pub fn toc_pages_prompt(toc_text: &str, topic: &str) -> String {
    format!(
        r#"You are an index analysis bot. Your task is to find the page numbers for a specific lesson topic from a book's table of contents.
The lesson topic is: "{topic}"
Here is the text of the table of contents:
---
{toc_text}
---
Analyze the table of contents and find the page or range of pages corresponding to the lesson topic.
Respond with ONLY the page numbers.
- If it's a single page, respond with the number (e.g., "42").
- If it's a range of pages (which is most common), find the start page for "{topic}" and the start page for the *next* lesson, then subtract one. Respond with a dash (e.g., "42-46").
Do NOT add any other words, sentences, or explanations. Just the numbers.
"#
    )
}

const TEACHER_STRUCTURE: &str = r####"## Guide de conception d'une fiche pédagogique
1. **Informations générales**
   - Titre du chapitre : (déduire du texte)
   - Titre de la leçon : (utiliser le sujet donné)
   - Durée : 45 min
   - Classe : (utiliser la classe donnée)
2. **Objectifs**
   - Formuler 2-3 objectifs précis que l'élève doit savoir ou savoir-faire. Utiliser des verbes d'action (nommer, identifier, comparer…).
3. **Déroulement de la séance** (puces en phrases complètes, regroupées par phases avec durée, ex : "### Introduction (5 min)")
   - phrase complète 1…
   - phrase complète 2…
4. **Évaluation**
   - Décrire les outils (questions orales, exercices écrits, etc.).
5. **Remarques et conclusion**
   - Consignes simples, s'appuyer sur le manuel, encourager la participation."####;

const TEACHER_EXAMPLE: &str = r#"## EXEMPLE DE STYLE
Titre du chapitre : La santé de l'être humain.
Titre de la leçon : Les 5 sens.
Durée : 45 min.
Classe : C.P.
Objectif : Faire connaître aux élèves nos cinq principaux organes sensoriels...
Déroulement : Pour commencer, je demande aux élèves de bien observer... je pose la question... je demande aux élèves de prendre leur livre page 8... Je passe vérifier les réponses. Je lis la consigne de l'exercice 2... Je demande aux élèves d'observer les images dans le manuel... Je distribue les fiches d'activités... Pour conclure, je résume les points clés...
(Le style est direct, utilise "je", et les actions sont concrètes.)
Conclusion du cours (résumé bref de 2-4 lignes que les élèves écrivent dans leur cahier à la fin de la leçon) : basée sur les objectifs de la leçon, un résumé de ce que les élèves ont appris."#;

/// Lesson plan prompt built from the extracted textbook pages.
pub fn teacher_sheet_prompt(lesson_text: &str, topic: &str, class_level: &str) -> String {
    format!(
        r#"Tu es un assistant expert pour les enseignants du primaire. Ta tâche est de créer une "Fiche Pédagogique" claire, engageante et structurée en français.

**MISSION :**
Crée une fiche pédagogique complète pour la leçon "{topic}" pour la classe de {class_level}.

**MATÉRIEL SOURCE (texte du manuel scolaire sur lequel tu dois te baser : suivre le programme est essentiel, tout en respectant l'enchaînement de la leçon et un rythme confortable pour les élèves) :**
---
{lesson_text}
---

**STRUCTURE REQUISE (à remplir) :**
---
{TEACHER_STRUCTURE}
---

**EXEMPLE DE STYLE À IMITER (le professeur commence par interagir avec les élèves) :**
---
{TEACHER_EXAMPLE}
---

**INSTRUCTIONS DÉTAILLÉES :**
1. Analyse le MATÉRIEL SOURCE pour comprendre les concepts clés de la leçon.
2. Remplis chaque section de la STRUCTURE REQUISE en te basant sur le matériel.
3. Adopte le ton et le style de l'EXEMPLE : direct, pratique, et utilisant "je" pour décrire les actions de l'enseignant.
4. Sois créatif mais fidèle : activités engageantes, mais conformes au manuel.
5. Formatage Markdown : sous-titres de phase au format `### Titre de phase (X min)` puis des puces en phrases complètes.
6. Le déroulement doit tenir en 45 min de façon réaliste (environ 30 minutes d'activités effectives) : garde un rythme et un avancement réalistes sans noter les temps morts.
7. Commence directement, sans phrase d'introduction.
8. Utilise des transitions claires entre les activités pour maintenir l'attention des élèves.
9. Réfère-toi aux activités et exercices du manuel (ex : Je demande aux élèves de prendre leur livre page X… Je lis la consigne de l'exercice Y… Je demande aux élèves d'observer les images du manuel…).
"#
    )
}

/// Revision notes prompt built from the extracted textbook pages.
pub fn student_notes_prompt(lesson_text: &str, topic: &str, class_level: &str) -> String {
    format!(
        r#"Crée une fiche de révision claire en français.

SUJET : {topic}
NIVEAU : {class_level}

TEXTE SOURCE :
---
{lesson_text}
---

FORMAT MARKDOWN :
## Sujet Principal
Titre : {topic}
Niveau : {class_level}

## Les Idées Clés
- Puces simples. Mets en gras les termes clés.

## Définitions Importantes
- **Terme** : définition simple.

## Exemples Pratiques
- 1 à 2 exemples.

## Résumé en une Phrase
- Une seule phrase qui résume tout.

IMPORTANT : commence directement, sans phrase d'introduction.
"#
    )
}

/// Revision notes prompt for a topic with no source textbook.
pub fn free_topic_prompt(topic: &str, class_level: &str, country: &str, subject: &str) -> String {
    format!(
        r#"Crée une fiche de révision en français pour un élève.

CONTEXTE :
- Matière : {subject}
- Niveau : {class_level}
- Pays/Curriculum : {country}

FORMAT MARKDOWN :
## Sujet Principal
Titre : {topic}
Matière : {subject}
Niveau : {class_level}
Pays : {country}

## Les Idées Clés
- Puces simples. Mets en gras les **termes clés**.

## Définitions Importantes
- **Terme** : définition simple.

## Exemples Pratiques
- 1 à 2 exemples.

## Pour Aller Plus Loin (Optionnel)
- Suggestion liée ou anecdote.

IMPORTANT : commence directement.
"#
    )
}
