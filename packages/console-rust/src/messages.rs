//! User-facing messages, in Portuguese, built from a resource's noun.

use autodrive_core::{EntityId, Gender, Noun};

fn agree(noun: &Noun, feminine: &'static str, masculine: &'static str) -> &'static str {
    match noun.gender {
        Gender::Feminine => feminine,
        Gender::Masculine => masculine,
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// "Erro ao carregar vendas. Tente novamente mais tarde."
#[must_use]
pub fn load_failed(noun: &Noun) -> String {
    format!("Erro ao carregar {}. Tente novamente mais tarde.", noun.plural)
}

/// Shown when a record or the data its form needs could not be loaded.
#[must_use]
pub fn edit_load_failed() -> String {
    "Erro ao carregar dados. Tente novamente mais tarde.".to_string()
}

/// "Venda não encontrada."
#[must_use]
pub fn not_found(noun: &Noun) -> String {
    format!(
        "{} não {}.",
        capitalize(noun.singular),
        agree(noun, "encontrada", "encontrado")
    )
}

/// "Nenhuma venda encontrada."
#[must_use]
pub fn empty_list(noun: &Noun) -> String {
    format!(
        "{} {} {}.",
        agree(noun, "Nenhuma", "Nenhum"),
        noun.singular,
        agree(noun, "encontrada", "encontrado")
    )
}

#[must_use]
pub fn save_failed(noun: &Noun) -> String {
    format!("Erro ao salvar {}.", noun.singular)
}

#[must_use]
pub fn delete_failed(noun: &Noun) -> String {
    format!("Erro ao excluir {}.", noun.singular)
}

#[must_use]
pub fn created(noun: &Noun) -> String {
    format!(
        "{} {} com sucesso!",
        capitalize(noun.singular),
        agree(noun, "criada", "criado")
    )
}

#[must_use]
pub fn updated(noun: &Noun) -> String {
    format!(
        "{} {} com sucesso!",
        capitalize(noun.singular),
        agree(noun, "atualizada", "atualizado")
    )
}

#[must_use]
pub fn deleted(noun: &Noun) -> String {
    format!(
        "{} {} com sucesso!",
        capitalize(noun.singular),
        agree(noun, "excluída", "excluído")
    )
}

/// "Tem certeza que deseja excluir a venda ID: 3?"
#[must_use]
pub fn delete_prompt(noun: &Noun, id: EntityId) -> String {
    format!("Tem certeza que deseja excluir {} ID: {id}?", noun.with_article())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SALE: Noun = Noun::feminine("venda", "vendas");
    const AD: Noun = Noun::masculine("anúncio", "anúncios");

    #[test]
    fn feminine_messages() {
        assert_eq!(
            load_failed(&SALE),
            "Erro ao carregar vendas. Tente novamente mais tarde."
        );
        assert_eq!(created(&SALE), "Venda criada com sucesso!");
        assert_eq!(deleted(&SALE), "Venda excluída com sucesso!");
        assert_eq!(save_failed(&SALE), "Erro ao salvar venda.");
        assert_eq!(delete_failed(&SALE), "Erro ao excluir venda.");
        assert_eq!(empty_list(&SALE), "Nenhuma venda encontrada.");
        assert_eq!(
            delete_prompt(&SALE, EntityId(3)),
            "Tem certeza que deseja excluir a venda ID: 3?"
        );
    }

    #[test]
    fn masculine_messages_capitalize_accented_nouns() {
        assert_eq!(updated(&AD), "Anúncio atualizado com sucesso!");
        assert_eq!(not_found(&AD), "Anúncio não encontrado.");
        assert_eq!(empty_list(&AD), "Nenhum anúncio encontrado.");
        assert_eq!(
            delete_prompt(&AD, EntityId(12)),
            "Tem certeza que deseja excluir o anúncio ID: 12?"
        );
    }
}
