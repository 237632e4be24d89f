//! Static HTML form for exercising the API from a browser.

pub const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
    <title>fnrun</title>
</head>
<body>
    <h1>fnrun</h1>
    <p>The API is working!</p>

    <h2>Create Function</h2>
    <form id="create-form">
        <label for="name">Function Name:</label>
        <input type="text" id="name" name="name"><br><br>
        <label for="code">Function Code:</label><br>
        <textarea id="code" name="code" rows="10" cols="50"></textarea><br><br>
        <button type="button" onclick="createFunction()">Create Function</button>
    </form>

    <h2>Run Function</h2>
    <form id="run-form">
        <label for="run-name">Function Name:</label>
        <input type="text" id="run-name" name="run-name"><br><br>
        <label for="input">Input Data:</label><br>
        <textarea id="input" name="input" rows="10" cols="50"></textarea><br><br>
        <button type="button" onclick="runFunction()">Run Function</button>
    </form>

    <h2>Delete Function</h2>
    <form id="delete-form">
        <label for="delete-name">Function Name:</label>
        <input type="text" id="delete-name" name="delete-name"><br><br>
        <button type="button" onclick="deleteFunction()">Delete Function</button>
    </form>

    <script>
        async function show(response) {
            const result = await response.json();
            alert(result.message || result.error || JSON.stringify(result));
        }

        async function createFunction() {
            const name = document.getElementById('name').value;
            const code = document.getElementById('code').value;
            const response = await fetch('/create_function', {
                method: 'POST',
                headers: {'Content-Type': 'application/json'},
                body: JSON.stringify({name: name, code: code})
            });
            await show(response);
        }

        async function runFunction() {
            const name = encodeURIComponent(document.getElementById('run-name').value);
            const input = document.getElementById('input').value;
            const response = await fetch(`/run_function/${name}`, {
                method: 'POST',
                headers: {'Content-Type': 'application/json'},
                body: JSON.stringify({input: input})
            });
            const result = await response.json();
            alert(JSON.stringify(result));
        }

        async function deleteFunction() {
            const name = encodeURIComponent(document.getElementById('delete-name').value);
            const response = await fetch(`/delete_function/${name}`, {method: 'DELETE'});
            await show(response);
        }
    </script>
</body>
</html>
"#;
